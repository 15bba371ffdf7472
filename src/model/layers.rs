//! Layer configuration lists and the network builder
//!
//! Networks are described as a flat list of [`LayerSpec`] entries. The
//! builder walks the list, tracks the activation shape, creates the torch
//! modules with the right input sizes and returns an opaque [`Network`].

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use crate::error::{Error, Result};

/// Convolution padding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Pad by `kernel / 2`, output size is `ceil(input / stride)` for odd kernels
    Same,
    /// No padding
    Valid,
}

/// One entry of a layer configuration list
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    /// Fully connected layer
    Dense { units: i64 },
    /// Batch normalization (1d after dense layers, 2d after convolutions)
    BatchNorm,
    /// 2D convolution
    Conv2d {
        filters: i64,
        kernel: i64,
        stride: i64,
        padding: Padding,
    },
    /// Nearest-neighbour upsampling by an integer factor
    Upsample { factor: i64 },
    /// Reshape a flat activation into (channels, height, width)
    Reshape { channels: i64, height: i64, width: i64 },
    /// Flatten (channels, height, width) into a vector
    Flatten,
    /// Dropout, active in training mode only
    Dropout { rate: f64 },
    Relu,
    LeakyRelu { slope: f64 },
    Tanh,
}

/// Activation shape without the batch dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Flat(i64),
    Spatial { channels: i64, height: i64, width: i64 },
}

impl Shape {
    /// Number of scalars per sample
    pub fn numel(&self) -> i64 {
        match *self {
            Shape::Flat(n) => n,
            Shape::Spatial {
                channels,
                height,
                width,
            } => channels * height * width,
        }
    }
}

#[derive(Debug)]
enum Layer {
    Linear(nn::Linear),
    Conv(nn::Conv2D),
    BatchNorm(nn::BatchNorm),
    Upsample(i64),
    Reshape([i64; 3]),
    Flatten,
    Dropout(f64),
    Relu,
    LeakyRelu(f64),
    Tanh,
}

impl Layer {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self {
            Layer::Linear(linear) => linear.forward(xs),
            Layer::Conv(conv) => conv.forward(xs),
            Layer::BatchNorm(bn) => bn.forward_t(xs, train),
            Layer::Upsample(factor) => {
                let size = xs.size();
                let (h, w) = (size[2], size[3]);
                xs.upsample_nearest2d([h * factor, w * factor], None::<f64>, None::<f64>)
            }
            Layer::Reshape([c, h, w]) => xs.view([-1, *c, *h, *w]),
            Layer::Flatten => xs.flatten(1, -1),
            Layer::Dropout(rate) => xs.dropout(*rate, train),
            Layer::Relu => xs.relu(),
            // max(x, slope * x) equals leaky relu for 0 <= slope < 1
            Layer::LeakyRelu(slope) => xs.maximum(&(xs * *slope)),
            Layer::Tanh => xs.tanh(),
        }
    }
}

/// Trainable network produced by [`build_network`]
#[derive(Debug)]
pub struct Network {
    layers: Vec<Layer>,
    output: Shape,
}

impl Network {
    /// Shape produced per sample
    pub fn output_shape(&self) -> Shape {
        self.output
    }

    /// Number of layers
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl ModuleT for Network {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let mut x = xs.shallow_clone();
        for layer in &self.layers {
            x = layer.forward_t(&x, train);
        }
        x
    }
}

fn conv_output(size: i64, kernel: i64, stride: i64, padding: i64) -> i64 {
    (size + 2 * padding - kernel) / stride + 1
}

/// Build a network from a layer configuration list
///
/// Parameters are registered under `vs` as `<index>_<kind>` so two networks
/// built from the same list produce identically named variables.
pub fn build_network(vs: &nn::Path, input: Shape, specs: &[LayerSpec]) -> Result<Network> {
    let mut shape = input;
    let mut layers = Vec::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        let (layer, next) = match (spec, shape) {
            (LayerSpec::Dense { units }, Shape::Flat(n)) => {
                let linear = nn::linear(vs / format!("{i}_dense"), n, *units, Default::default());
                (Layer::Linear(linear), Shape::Flat(*units))
            }
            (LayerSpec::BatchNorm, Shape::Flat(n)) => {
                let bn = nn::batch_norm1d(vs / format!("{i}_bn"), n, Default::default());
                (Layer::BatchNorm(bn), shape)
            }
            (LayerSpec::BatchNorm, Shape::Spatial { channels, .. }) => {
                let bn = nn::batch_norm2d(vs / format!("{i}_bn"), channels, Default::default());
                (Layer::BatchNorm(bn), shape)
            }
            (
                LayerSpec::Conv2d {
                    filters,
                    kernel,
                    stride,
                    padding,
                },
                Shape::Spatial {
                    channels,
                    height,
                    width,
                },
            ) => {
                let pad = match padding {
                    Padding::Same => kernel / 2,
                    Padding::Valid => 0,
                };
                let out_h = conv_output(height, *kernel, *stride, pad);
                let out_w = conv_output(width, *kernel, *stride, pad);
                if out_h <= 0 || out_w <= 0 {
                    return Err(Error::Architecture(format!(
                        "layer {i}: {kernel}x{kernel} kernel does not fit {height}x{width} input"
                    )));
                }

                let config = nn::ConvConfig {
                    stride: *stride,
                    padding: pad,
                    ..Default::default()
                };
                let conv = nn::conv2d(vs / format!("{i}_conv"), channels, *filters, *kernel, config);
                let next = Shape::Spatial {
                    channels: *filters,
                    height: out_h,
                    width: out_w,
                };
                (Layer::Conv(conv), next)
            }
            (
                LayerSpec::Upsample { factor },
                Shape::Spatial {
                    channels,
                    height,
                    width,
                },
            ) => {
                let next = Shape::Spatial {
                    channels,
                    height: height * factor,
                    width: width * factor,
                };
                (Layer::Upsample(*factor), next)
            }
            (
                LayerSpec::Reshape {
                    channels,
                    height,
                    width,
                },
                Shape::Flat(n),
            ) => {
                if channels * height * width != n {
                    return Err(Error::Architecture(format!(
                        "layer {i}: cannot reshape {n} values into {channels}x{height}x{width}"
                    )));
                }
                let next = Shape::Spatial {
                    channels: *channels,
                    height: *height,
                    width: *width,
                };
                (Layer::Reshape([*channels, *height, *width]), next)
            }
            (LayerSpec::Flatten, _) => (Layer::Flatten, Shape::Flat(shape.numel())),
            (LayerSpec::Dropout { rate }, _) => (Layer::Dropout(*rate), shape),
            (LayerSpec::Relu, _) => (Layer::Relu, shape),
            (LayerSpec::LeakyRelu { slope }, _) => (Layer::LeakyRelu(*slope), shape),
            (LayerSpec::Tanh, _) => (Layer::Tanh, shape),
            (spec, shape) => {
                return Err(Error::Architecture(format!(
                    "layer {i}: {spec:?} cannot follow activation of shape {shape:?}"
                )));
            }
        };

        layers.push(layer);
        shape = next;
    }

    Ok(Network {
        layers,
        output: shape,
    })
}
