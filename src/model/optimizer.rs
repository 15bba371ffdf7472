//! Optimizer settings shared by both networks

use serde::{Deserialize, Serialize};
use tch::{nn, nn::OptimizerConfig};

use crate::error::Result;

/// Adam settings for one network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
}

impl OptimizerSettings {
    /// Build an Adam optimizer over every variable of `vs`
    pub fn build(&self, vs: &nn::VarStore) -> Result<nn::Optimizer> {
        let adam = nn::Adam {
            beta1: self.beta1,
            beta2: self.beta2,
            ..Default::default()
        };
        Ok(adam.build(vs, self.learning_rate)?)
    }

    /// Slow, low-momentum Adam for the discriminator
    pub fn discriminator_default() -> Self {
        Self {
            learning_rate: 1e-5,
            beta1: 0.1,
            beta2: 0.999,
        }
    }

    /// Adam for the generator
    pub fn generator_default() -> Self {
        Self {
            learning_rate: 8e-5,
            beta1: 0.5,
            beta2: 0.999,
        }
    }
}
