use std::fmt;

/// Where a model's weights came from. The weights are present exactly
/// when the slot is not `Empty`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum WeightSlot<W> {
    Empty,
    Loaded(W),
    Trained(W),
}

impl<W> WeightSlot<W> {
    pub(crate) fn weights(&self) -> Option<&W> {
        match self {
            WeightSlot::Empty => None,
            WeightSlot::Loaded(w) | WeightSlot::Trained(w) => Some(w),
        }
    }

    pub(crate) fn detector_state(&self) -> DetectorState {
        match self {
            WeightSlot::Empty => DetectorState::DefaultUntrained,
            WeightSlot::Loaded(_) => DetectorState::LoadedFromFile,
            WeightSlot::Trained(_) => DetectorState::Trained,
        }
    }

    pub(crate) fn predictor_state(&self) -> PredictorState {
        match self {
            WeightSlot::Empty => PredictorState::Untrained,
            WeightSlot::Loaded(_) => PredictorState::LoadedFromFile,
            WeightSlot::Trained(_) => PredictorState::Trained,
        }
    }
}

/// Lifecycle state of a detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorState {
    /// No weights of its own; inference uses the backend's default detector.
    DefaultUntrained,
    LoadedFromFile,
    Trained,
}

/// Lifecycle state of a shape predictor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictorState {
    /// Nothing to infer with until trained or loaded.
    Untrained,
    LoadedFromFile,
    Trained,
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorState::DefaultUntrained => f.write_str("default (untrained)"),
            DetectorState::LoadedFromFile => f.write_str("loaded from file"),
            DetectorState::Trained => f.write_str("trained"),
        }
    }
}

impl fmt::Display for PredictorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictorState::Untrained => f.write_str("untrained"),
            PredictorState::LoadedFromFile => f.write_str("loaded from file"),
            PredictorState::Trained => f.write_str("trained"),
        }
    }
}
