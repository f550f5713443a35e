//! Scripted sessions: a recorded sequence of state pushes and pointer
//! events replayed against a [`Card`].

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::engine::Card;
use crate::engine::ControlService;
use crate::engine::Frame;
use crate::engine::RowRef;
use crate::engine::StateSnapshot;
use crate::engine::TrackBounds;
use crate::engine::Zone;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One host event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Push {
        states: StateSnapshot,
    },
    PointerDown {
        row: RowRef,
        x: f64,
        bounds: TrackBounds,
    },
    PointerMove {
        row: RowRef,
        x: f64,
    },
    PointerUp {
        row: RowRef,
        x: f64,
    },
    PointerCancel {
        row: RowRef,
    },
    Tap {
        row: RowRef,
        zone: Zone,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    pub steps: Vec<Step>,
}

impl Step {
    pub fn apply<S: ControlService>(&self, card: &mut Card<S>) -> Frame {
        match self {
            Step::Push { states } => card.push_state(states.clone()),
            Step::PointerDown { row, x, bounds } => card.pointer_down(row, *x, *bounds),
            Step::PointerMove { row, x } => card.pointer_move(row, *x),
            Step::PointerUp { row, x } => card.pointer_up(row, *x),
            Step::PointerCancel { row } => card.pointer_cancel(row),
            Step::Tap { row, zone } => card.tap(row, *zone),
        }
    }
}

impl Session {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        read_json(path.as_ref())
    }

    /// Apply every step in order. Returns one frame per step.
    pub fn run<S: ControlService>(&self, card: &mut Card<S>) -> Vec<Frame> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let frame = step.apply(card);
                debug!(step = i, paints = frame.len(), "applied step");
                frame
            })
            .collect()
    }
}

/// Load a single state snapshot, as pushed by the host.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<StateSnapshot, ScriptError> {
    read_json(path.as_ref())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ScriptError> {
    let content = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ScriptError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
