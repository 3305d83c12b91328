//! Process-wide collaborator sinks, bundled into one [`Services`] value that
//! is handed to the estimator at construction instead of living in ambient
//! globals.

use crate::dirs::PathDir;
use crate::terrain::MoveClass;

/// Receives human-readable progress lines during long precompute runs.
pub trait ProgressSink {
	/// Publishes a progress message. `replace` hints that the message may
	/// overwrite the previous one instead of appending.
	fn load_message(&self, message: &str, replace: bool);
}

/// Receives compact machine-readable progress codes, e.g. for forwarding to
/// other participants of a networked session. Must not block.
pub trait StatusChannel {
	/// Publishes one status word.
	fn publish(&self, payload: u32);
}

/// Dynamic crowd-avoidance cost overlay sampled during block searches.
pub trait FlowField {
	/// Extra cost of entering the square from the given direction.
	fn flow_cost(&self, x: u32, z: u32, class: &MoveClass, dir: PathDir) -> f32;
}

/// User-scripted cost overlay sampled during block searches.
pub trait CostOverlay {
	/// Extra cost of touching the square. `synced` distinguishes the
	/// deterministic simulation overlay from the presentation-only one.
	fn extra_cost(&self, x: u32, z: u32, synced: bool) -> f32;
}

/// The sinks and overlays an estimator consults. All of them are optional;
/// the default value is fully inert.
#[derive(Default)]
pub struct Services {
	/// Progress line sink, written only by the precompute driver's worker
	/// zero.
	pub progress: Option<Box<dyn ProgressSink>>,
	/// Status word channel, written only by worker zero.
	pub status: Option<Box<dyn StatusChannel>>,
	/// Crowd-avoidance cost field.
	pub flow: Option<Box<dyn FlowField>>,
	/// Scripted cost overlay.
	pub overlay: Option<Box<dyn CostOverlay>>,
}

impl Services {
	pub(crate) fn load_message(&self, message: &str, replace: bool) {
		if let Some(progress) = &self.progress {
			progress.load_message(message, replace);
		}
	}

	pub(crate) fn publish_status(&self, payload: u32) {
		if let Some(status) = &self.status {
			status.publish(payload);
		}
	}

	pub(crate) fn flow_cost(&self, x: u32, z: u32, class: &MoveClass, dir: PathDir) -> f32 {
		match &self.flow {
			Some(flow) => flow.flow_cost(x, z, class, dir),
			None => 0.0,
		}
	}

	pub(crate) fn extra_cost(&self, x: u32, z: u32, synced: bool) -> f32 {
		match &self.overlay {
			Some(overlay) => overlay.extra_cost(x, z, synced),
			None => 0.0,
		}
	}
}

impl std::fmt::Debug for Services {
	fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
		fmt.debug_struct("Services")
			.field("progress", &self.progress.is_some())
			.field("status", &self.status.is_some())
			.field("flow", &self.flow.is_some())
			.field("overlay", &self.overlay.is_some())
			.finish()
	}
}
