use std::path::Path;

use crate::backend::domain::vision_backend::VisionBackend;
use crate::config::option_bag::OptionBag;
use crate::lifecycle::detector::Detector;
use crate::lifecycle::predictor::Predictor;
use crate::shared::error::Result;
use crate::shared::model_kind::ModelKind;

/// Either kind of trainable model.
pub enum Model<B: VisionBackend> {
    Detector(Detector<B>),
    Predictor(Predictor<B>),
}

impl<B: VisionBackend> Model<B> {
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Detector(_) => ModelKind::Detector,
            Model::Predictor(_) => ModelKind::Predictor,
        }
    }

    /// Human-readable lifecycle state.
    pub fn state_name(&self) -> String {
        match self {
            Model::Detector(d) => d.state().to_string(),
            Model::Predictor(p) => p.state().to_string(),
        }
    }

    pub fn train(&mut self, dataset: &Path, options: Option<&OptionBag>) -> Result<()> {
        match self {
            Model::Detector(d) => d.train(dataset, options),
            Model::Predictor(p) => p.train(dataset, options),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            Model::Detector(d) => d.save(path),
            Model::Predictor(p) => p.save(path),
        }
    }

    pub fn as_detector(&self) -> Option<&Detector<B>> {
        match self {
            Model::Detector(d) => Some(d),
            Model::Predictor(_) => None,
        }
    }

    pub fn as_predictor(&self) -> Option<&Predictor<B>> {
        match self {
            Model::Predictor(p) => Some(p),
            Model::Detector(_) => None,
        }
    }
}

impl<B: VisionBackend> From<Detector<B>> for Model<B> {
    fn from(detector: Detector<B>) -> Self {
        Model::Detector(detector)
    }
}

impl<B: VisionBackend> From<Predictor<B>> for Model<B> {
    fn from(predictor: Predictor<B>) -> Self {
        Model::Predictor(predictor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::Harness;
    use crate::shared::error::Error;

    #[test]
    fn test_kind_and_state_dispatch() {
        let harness = Harness::new();
        let detector: Model<_> = Detector::new(harness.context.clone()).into();
        let predictor: Model<_> = Predictor::new(harness.context.clone()).into();

        assert_eq!(detector.kind(), ModelKind::Detector);
        assert_eq!(detector.state_name(), "default (untrained)");
        assert_eq!(predictor.kind(), ModelKind::Predictor);
        assert_eq!(predictor.state_name(), "untrained");
        assert!(detector.as_predictor().is_none());
        assert!(predictor.as_predictor().is_some());
    }

    #[test]
    fn test_save_dispatches_per_kind() {
        let harness = Harness::new();
        let dir = tempfile::tempdir().unwrap();
        let detector: Model<_> = Detector::new(harness.context.clone()).into();
        let predictor: Model<_> = Predictor::new(harness.context.clone()).into();

        assert!(detector.save(&dir.path().join("d.model")).is_ok());
        assert!(matches!(
            predictor.save(&dir.path().join("p.model")),
            Err(Error::NotTrained { .. })
        ));
    }

    #[test]
    fn test_train_dispatches_per_kind() {
        let harness = Harness::new();
        let mut predictor: Model<_> = Predictor::new(harness.context.clone()).into();

        predictor.train(Path::new("shapes.xml"), None).unwrap();

        assert_eq!(predictor.state_name(), "trained");
        assert_eq!(harness.backend_calls(), vec!["train_shape_predictor"]);
    }
}
