use std::fmt;

/// The fixed set of trainable model kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Detector,
    Predictor,
}

impl ModelKind {
    /// Byte stored in model file headers.
    pub fn tag(self) -> u8 {
        match self {
            ModelKind::Detector => 0,
            ModelKind::Predictor => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ModelKind::Detector),
            1 => Some(ModelKind::Predictor),
            _ => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Detector => f.write_str("detector"),
            ModelKind::Predictor => f.write_str("shape predictor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for kind in [ModelKind::Detector, ModelKind::Predictor] {
            assert_eq!(ModelKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ModelKind::from_tag(7), None);
    }
}
