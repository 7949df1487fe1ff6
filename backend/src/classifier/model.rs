use std::sync::{Arc, Mutex};

use tch::nn::ModuleT;
use tch::{CModule, Device, Tensor};

use super::classes::NUM_CLASSES;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("unable to decode image: {0}")]
    Decode(String),
    #[error("failed to load model artifact: {0}")]
    ModelLoad(#[source] tch::TchError),
    #[error("inference error: {0}")]
    Inference(#[from] tch::TchError),
    #[error("model produced {0} outputs, expected {expected}", expected = NUM_CLASSES)]
    UnexpectedOutputSize(usize),
}

/// Outcome of one forward pass: a softmax distribution over the ten
/// distraction classes, the arg-max index and its probability.
#[derive(Debug, Clone)]
pub struct Classification {
    pub probabilities: Vec<f32>,
    pub predicted_label: usize,
    pub confidence: f32,
}

/// Pretrained TorchScript classifier, loaded once at startup and shared
/// read-only across request workers.
#[derive(Debug, Clone)]
pub struct Model {
    module: Arc<Mutex<CModule>>,
    device: Device,
}

impl Model {
    pub fn load(model_path: &str) -> Result<Self, ClassifierError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(model_path, device)
            .map_err(ClassifierError::ModelLoad)?;
        Ok(Self {
            module: Arc::new(Mutex::new(module)),
            device,
        })
    }

    /// Pure forward inference over a preprocessed (1, 3, 224, 224) tensor.
    pub fn classify(&self, tensor: &Tensor) -> Result<Classification, ClassifierError> {
        let input = tensor.to_device(self.device);
        let output = {
            let module = self.module.lock().unwrap();
            module.forward_t(&input, false)
        };
        let output = output.softmax(-1, tch::Kind::Float);
        let output_flat = output.to_kind(tch::Kind::Float).view([-1]);

        let num_elements = output_flat.size()[0] as usize;
        if num_elements != NUM_CLASSES {
            return Err(ClassifierError::UnexpectedOutputSize(num_elements));
        }
        let mut probabilities = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut probabilities, num_elements);

        let predicted_label = argmax(&probabilities);
        let confidence = probabilities[predicted_label];

        Ok(Classification {
            probabilities,
            predicted_label,
            confidence,
        })
    }
}

/// Index of the maximum value; ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_maximum_index() {
        let probs = [0.05, 0.1, 0.6, 0.05, 0.05, 0.05, 0.02, 0.03, 0.02, 0.03];
        assert_eq!(argmax(&probs), 2);
    }

    #[test]
    fn argmax_ties_break_to_lowest_index() {
        let probs = [0.1, 0.3, 0.3, 0.3];
        assert_eq!(argmax(&probs), 1);
    }

    #[test]
    fn missing_artifact_is_a_load_error() {
        let err = Model::load("/nonexistent/model.pt").unwrap_err();
        assert!(matches!(err, ClassifierError::ModelLoad(_)));
    }
}
