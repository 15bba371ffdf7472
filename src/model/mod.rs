//! Model module containing the conditional GAN components
//!
//! This module provides:
//! - Layer configuration lists and the network builder
//! - Generator network for creating labeled digits
//! - Discriminator network for judging label-conditioned images
//! - Composite trainer updating the generator through the frozen discriminator
//! - ConditionalGan wrapper combining both networks

pub mod layers;
mod generator;
mod discriminator;
mod composite;
mod optimizer;
mod cgan;

pub use generator::{Generator, GeneratorConfig};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use composite::{CompositeTrainer, DiscriminatorMode};
pub use optimizer::OptimizerSettings;
pub use cgan::{CganConfig, ConditionalGan};
