//! Snapshot reconciliation
//!
//! Merges a freshly fetched remote snapshot with the current local snapshot,
//! keyed by entity id — no clocks are trusted:
//! - Places in both replicas: the remote place is the base (it is assumed to
//!   hold other clients' writes), its sections reconciled against local.
//! - Places present in only one replica are kept; absence is never treated
//!   as deletion, since a stale remote is indistinguishable from an
//!   intentional removal without tombstones.
//! - Image sequences union by id: remote order first, local-only entries
//!   appended in local order. For an id present in both, a blob locator from
//!   either side survives (a locator is strictly more durable than a bare
//!   embedded payload) and an embedded payload is never lost locally.
//! - Task and equipment sequences union the same way; for items present in
//!   both, remote scalar fields win and the item's images union recursively.
//!
//! The merge is deterministic and idempotent: `merge(A, A) == A` and
//! `merge(A, merge(A, B)) == merge(A, B)`.

use std::collections::HashSet;

use stagedoc_types::types::{EquipmentItem, ImageRef, Place, Sections, TaskItem};
use uuid::Uuid;

/// Reconcile `remote` against `local`, consuming the remote snapshot.
pub fn merge_places(remote: Vec<Place>, local: &[Place]) -> Vec<Place> {
	let remote_ids: HashSet<Uuid> = remote.iter().map(|p| p.id).collect();
	let mut out = Vec::with_capacity(remote.len() + local.len());

	for mut place in remote {
		if let Some(local_place) = local.iter().find(|p| p.id == place.id) {
			merge_sections(&mut place.sections, &local_place.sections);
		}
		out.push(place);
	}

	// Local-only places have not been uploaded yet — never drop them.
	for place in local {
		if !remote_ids.contains(&place.id) {
			out.push(place.clone());
		}
	}

	out
}

fn merge_sections(remote: &mut Sections, local: &Sections) {
	merge_images(&mut remote.equipment.images, &local.equipment.images);
	merge_equipments(&mut remote.equipment.equipments, &local.equipment.equipments);

	merge_images(&mut remote.tasks.images, &local.tasks.images);
	merge_tasks(&mut remote.tasks.tasks, &local.tasks.tasks);

	merge_images(&mut remote.wiring.images, &local.wiring.images);

	merge_images(&mut remote.teardown.images, &local.teardown.images);
	merge_tasks(&mut remote.teardown.tasks, &local.teardown.tasks);
}

/// Identity-keyed union of two image sequences, remote entries first.
fn merge_images(remote: &mut Vec<ImageRef>, local: &[ImageRef]) {
	for img in remote.iter_mut() {
		if let Some(local_img) = local.iter().find(|l| l.id == img.id) {
			// A locator from either side survives; an embedded payload that
			// the local copy still carries is not lost by merging.
			if img.blob_id.is_none() {
				img.blob_id = local_img.blob_id.clone();
			}
			if img.data.is_none() {
				img.data = local_img.data.clone();
			}
		}
	}

	let seen: HashSet<Uuid> = remote.iter().map(|i| i.id).collect();
	for local_img in local {
		if !seen.contains(&local_img.id) {
			remote.push(local_img.clone());
		}
	}
}

fn merge_tasks(remote: &mut Vec<TaskItem>, local: &[TaskItem]) {
	for task in remote.iter_mut() {
		if let Some(local_task) = local.iter().find(|l| l.id == task.id) {
			merge_images(&mut task.images, &local_task.images);
		}
	}

	let seen: HashSet<Uuid> = remote.iter().map(|t| t.id).collect();
	for local_task in local {
		if !seen.contains(&local_task.id) {
			remote.push(local_task.clone());
		}
	}
}

fn merge_equipments(remote: &mut Vec<EquipmentItem>, local: &[EquipmentItem]) {
	for item in remote.iter_mut() {
		if let Some(local_item) = local.iter().find(|l| l.id == item.id) {
			merge_images(&mut item.images, &local_item.images);
		}
	}

	let seen: HashSet<Uuid> = remote.iter().map(|e| e.id).collect();
	for local_item in local {
		if !seen.contains(&local_item.id) {
			remote.push(local_item.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stagedoc_types::types::SectionKind;

	fn place_with_image(name: &str, img: ImageRef) -> Place {
		let mut place = Place::new(name);
		place.sections.images_mut(SectionKind::Wiring).push(img);
		place
	}

	fn locator_image(name: &str) -> ImageRef {
		let mut img = ImageRef::embedded(name, b"bytes");
		img.blob_id = Some("places/x/wiring/y".into());
		img
	}

	#[test]
	fn merge_with_self_is_identity() {
		let mut item = EquipmentItem::new("Mixer X32");
		item.images.push(ImageRef::embedded("front.jpg", b"f"));
		let mut place = place_with_image("Hall A", locator_image("rack.jpg"));
		place.sections.equipment.equipments.push(item);
		place.sections.tasks.tasks.push(TaskItem::new("Soundcheck"));
		let set = vec![place];

		assert_eq!(merge_places(set.clone(), &set), set);
	}

	#[test]
	fn merge_twice_is_stable() {
		let a = vec![place_with_image("Hall A", ImageRef::embedded("a.jpg", b"a"))];
		let b = vec![place_with_image("Hall B", ImageRef::embedded("b.jpg", b"b"))];

		let once = merge_places(a.clone(), &b);
		let twice = merge_places(a, &once);
		assert_eq!(twice, once);
	}

	#[test]
	fn local_only_place_is_kept_unchanged() {
		let remote = vec![Place::new("Hall A")];
		let local_only = Place::new("Hall B");
		let local = vec![remote[0].clone(), local_only.clone()];

		let merged = merge_places(remote, &local);
		assert_eq!(merged.len(), 2);
		assert_eq!(merged[1], local_only);
	}

	#[test]
	fn image_union_has_no_duplicates() {
		let shared = ImageRef::embedded("shared.jpg", b"s");
		let mut remote_place = Place::new("Hall A");
		remote_place.sections.wiring.images.push(shared.clone());
		remote_place.sections.wiring.images.push(ImageRef::embedded("remote.jpg", b"r"));

		let mut local_place = remote_place.clone();
		local_place.sections.wiring.images = vec![shared, ImageRef::embedded("local.jpg", b"l")];

		let merged = merge_places(vec![remote_place], &[local_place]);
		let images = &merged[0].sections.wiring.images;
		let names: Vec<&str> = images.iter().map(|i| i.name.as_ref()).collect();
		assert_eq!(names, ["shared.jpg", "remote.jpg", "local.jpg"]);
	}

	#[test]
	fn locator_wins_over_bare_payload() {
		// Remote was slimmed after upload, local still has the payload only.
		let mut slim = locator_image("rack.jpg");
		slim.data = None;
		let mut bare = slim.clone();
		bare.blob_id = None;
		bare.data = Some("cGF5bG9hZA==".into());

		let remote = vec![place_with_image("Hall A", slim.clone())];
		let mut local_place = remote[0].clone();
		local_place.sections.wiring.images = vec![bare.clone()];

		let merged = merge_places(remote, &[local_place]);
		let img = &merged[0].sections.wiring.images[0];
		assert_eq!(img.blob_id, slim.blob_id);
		// The locally held payload is not dropped by merging.
		assert_eq!(img.data, bare.data);

		// Mirror case: only local has the locator.
		let remote = vec![place_with_image("Hall A", bare)];
		let mut local_place = remote[0].clone();
		local_place.sections.wiring.images = vec![slim.clone()];
		let merged = merge_places(remote, &[local_place]);
		assert_eq!(merged[0].sections.wiring.images[0].blob_id, slim.blob_id);
	}

	#[test]
	fn stale_remote_item_regains_local_images() {
		// Local added two images to an equipment item after the remote
		// snapshot was taken.
		let mut item = EquipmentItem::new("Mixer X32");
		let mut remote_place = Place::new("Hall A");
		remote_place.sections.equipment.equipments.push(item.clone());

		item.images.push(ImageRef::embedded("front.jpg", b"f"));
		item.images.push(ImageRef::embedded("back.jpg", b"b"));
		let mut local_place = remote_place.clone();
		local_place.sections.equipment.equipments = vec![item];

		let merged = merge_places(vec![remote_place], &[local_place]);
		assert_eq!(merged[0].sections.equipment.equipments[0].images.len(), 2);
	}

	#[test]
	fn local_only_task_survives() {
		let remote_place = Place::new("Hall A");
		let mut local_place = remote_place.clone();
		local_place.sections.teardown.tasks.push(TaskItem::new("Coil cables"));

		let merged = merge_places(vec![remote_place], &[local_place]);
		assert_eq!(merged[0].sections.teardown.tasks.len(), 1);
	}
}

// vim: ts=4
