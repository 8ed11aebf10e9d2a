//! Document model: venues ("places") carrying four fixed operational sections.
//!
//! A [`Place`] owns exactly four sections (equipment, tasks, wiring,
//! teardown). Each section kind has its own struct so that a section can only
//! carry the nested collections that are meaningful for its kind — a wiring
//! section holding a task list is unrepresentable.
//!
//! Wire format is camelCase JSON; empty optional sequences are omitted when
//! serializing and default to empty when absent.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four fixed section kinds of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
	Equipment,
	Tasks,
	Wiring,
	Teardown,
}

impl SectionKind {
	pub const ALL: [SectionKind; 4] =
		[SectionKind::Equipment, SectionKind::Tasks, SectionKind::Wiring, SectionKind::Teardown];

	/// Stable lowercase name, used in blob addressing.
	pub fn as_str(self) -> &'static str {
		match self {
			SectionKind::Equipment => "equipment",
			SectionKind::Tasks => "tasks",
			SectionKind::Wiring => "wiring",
			SectionKind::Teardown => "teardown",
		}
	}

	/// Whether sections of this kind carry a task checklist.
	pub fn has_tasks(self) -> bool {
		matches!(self, SectionKind::Tasks | SectionKind::Teardown)
	}
}

impl std::fmt::Display for SectionKind {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An attached image.
///
/// Always holds at least one of `data` (base64 payload, kept locally until
/// the bytes are offloaded) or `blob_id` (stable blob store locator). A set
/// `blob_id` is never removed; `data` may be stripped from remote-persisted
/// copies once a locator exists, but never from the local copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
	pub id: Uuid,
	pub name: Box<str>,

	/// Base64-encoded payload, present until the image is offloaded
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Box<str>>,

	/// Blob store locator, set once the payload has been uploaded
	#[serde(default, skip_serializing_if = "Option::is_none", rename = "blobId")]
	pub blob_id: Option<Box<str>>,
}

impl ImageRef {
	/// Create a new embedded-only image from raw bytes.
	pub fn embedded(name: &str, bytes: &[u8]) -> Self {
		Self {
			id: Uuid::new_v4(),
			name: name.into(),
			data: Some(STANDARD.encode(bytes).into_boxed_str()),
			blob_id: None,
		}
	}

	/// Decode the embedded payload, if any. Undecodable payloads read as absent.
	pub fn payload_bytes(&self) -> Option<Vec<u8>> {
		self.data.as_ref().and_then(|b64| STANDARD.decode(b64.as_bytes()).ok())
	}

	/// Whether this image still needs a blob upload.
	pub fn pending_upload(&self) -> bool {
		self.blob_id.is_none() && self.data.is_some()
	}
}

/// A checklist entry in a `tasks` or `teardown` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
	pub id: Uuid,
	pub text: Box<str>,
	#[serde(default)]
	pub done: bool,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageRef>,
}

impl TaskItem {
	pub fn new(text: &str) -> Self {
		Self { id: Uuid::new_v4(), text: text.into(), done: false, images: Vec::new() }
	}
}

/// An entry in the equipment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
	pub id: Uuid,
	pub text: Box<str>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageRef>,
}

impl EquipmentItem {
	pub fn new(text: &str) -> Self {
		Self { id: Uuid::new_v4(), text: text.into(), images: Vec::new() }
	}
}

/// Free-form section (wiring): notes text plus attached images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteSection {
	#[serde(default)]
	pub text: Box<str>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageRef>,
}

/// Section with a task checklist (tasks, teardown).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSection {
	#[serde(default)]
	pub text: Box<str>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageRef>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tasks: Vec<TaskItem>,
}

/// Section with an equipment list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSection {
	#[serde(default)]
	pub text: Box<str>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<ImageRef>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub equipments: Vec<EquipmentItem>,
}

/// The fixed four sections of a place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
	#[serde(default)]
	pub equipment: EquipmentSection,
	#[serde(default)]
	pub tasks: TaskSection,
	#[serde(default)]
	pub wiring: NoteSection,
	#[serde(default)]
	pub teardown: TaskSection,
}

impl Sections {
	pub fn text(&self, kind: SectionKind) -> &str {
		match kind {
			SectionKind::Equipment => &self.equipment.text,
			SectionKind::Tasks => &self.tasks.text,
			SectionKind::Wiring => &self.wiring.text,
			SectionKind::Teardown => &self.teardown.text,
		}
	}

	pub fn set_text(&mut self, kind: SectionKind, text: &str) {
		match kind {
			SectionKind::Equipment => self.equipment.text = text.into(),
			SectionKind::Tasks => self.tasks.text = text.into(),
			SectionKind::Wiring => self.wiring.text = text.into(),
			SectionKind::Teardown => self.teardown.text = text.into(),
		}
	}

	pub fn images(&self, kind: SectionKind) -> &[ImageRef] {
		match kind {
			SectionKind::Equipment => &self.equipment.images,
			SectionKind::Tasks => &self.tasks.images,
			SectionKind::Wiring => &self.wiring.images,
			SectionKind::Teardown => &self.teardown.images,
		}
	}

	pub fn images_mut(&mut self, kind: SectionKind) -> &mut Vec<ImageRef> {
		match kind {
			SectionKind::Equipment => &mut self.equipment.images,
			SectionKind::Tasks => &mut self.tasks.images,
			SectionKind::Wiring => &mut self.wiring.images,
			SectionKind::Teardown => &mut self.teardown.images,
		}
	}

	/// Task list of a checklist-bearing section; `None` for other kinds.
	pub fn tasks(&self, kind: SectionKind) -> Option<&[TaskItem]> {
		match kind {
			SectionKind::Tasks => Some(&self.tasks.tasks),
			SectionKind::Teardown => Some(&self.teardown.tasks),
			_ => None,
		}
	}

	pub fn tasks_mut(&mut self, kind: SectionKind) -> Option<&mut Vec<TaskItem>> {
		match kind {
			SectionKind::Tasks => Some(&mut self.tasks.tasks),
			SectionKind::Teardown => Some(&mut self.teardown.tasks),
			_ => None,
		}
	}
}

/// A venue with its four operational sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
	pub id: Uuid,
	pub name: Box<str>,
	#[serde(default)]
	pub sections: Sections,
}

impl Place {
	/// Create a place with four empty sections.
	pub fn new(name: &str) -> Self {
		Self { id: Uuid::new_v4(), name: name.into(), sections: Sections::default() }
	}

	/// Visit every image of the place: section images and item images.
	///
	/// The callback receives the owning section kind and, for item-scoped
	/// images, the owning item id.
	pub fn visit_images(&self, mut f: impl FnMut(SectionKind, Option<Uuid>, &ImageRef)) {
		for kind in SectionKind::ALL {
			for img in self.sections.images(kind) {
				f(kind, None, img);
			}
		}
		for item in &self.sections.equipment.equipments {
			for img in &item.images {
				f(SectionKind::Equipment, Some(item.id), img);
			}
		}
		for (kind, section) in
			[(SectionKind::Tasks, &self.sections.tasks), (SectionKind::Teardown, &self.sections.teardown)]
		{
			for item in &section.tasks {
				for img in &item.images {
					f(kind, Some(item.id), img);
				}
			}
		}
	}

	/// Mutable variant of [`Place::visit_images`].
	pub fn visit_images_mut(&mut self, mut f: impl FnMut(SectionKind, Option<Uuid>, &mut ImageRef)) {
		for kind in SectionKind::ALL {
			for img in self.sections.images_mut(kind) {
				f(kind, None, img);
			}
		}
		for item in &mut self.sections.equipment.equipments {
			for img in &mut item.images {
				f(SectionKind::Equipment, Some(item.id), img);
			}
		}
		for (kind, section) in [
			(SectionKind::Tasks, &mut self.sections.tasks),
			(SectionKind::Teardown, &mut self.sections.teardown),
		] {
			for item in &mut section.tasks {
				for img in &mut item.images {
					f(kind, Some(item.id), img);
				}
			}
		}
	}
}


// vim: ts=4
