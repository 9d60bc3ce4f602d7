use candle_core::{Result, Tensor};
use candle_nn::{ops, Activation, Module};

/// build a stack of alternating `M` and `A` layers, each followed by
/// dropout while training
pub struct StackLayers<M>
where
    M: Module,
{
    module_layers: Vec<M>,
    activation_layers: Vec<Option<Activation>>,
    dropout: f32,
}

impl<M> StackLayers<M>
where
    M: Module,
{
    pub fn new() -> Self {
        Self {
            module_layers: Vec::new(),
            activation_layers: Vec::new(),
            dropout: 0.0,
        }
    }

    pub fn with_dropout(dropout: f32) -> Self {
        Self {
            dropout,
            ..Self::new()
        }
    }

    /// Appends a layer after all the current layers.
    pub fn push_with_act(&mut self, layer: M, activation: Activation) {
        self.module_layers.push(layer);
        self.activation_layers.push(Some(activation));
    }

    pub fn push(&mut self, layer: M) {
        self.module_layers.push(layer);
        self.activation_layers.push(None);
    }

    pub fn len(&self) -> usize {
        self.module_layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.module_layers.is_empty()
    }

    /// Run all the layers; dropout only kicks in with `train`
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Result<Tensor> {
        let mut x = input.clone();
        for (module, activation) in self.module_layers.iter().zip(self.activation_layers.iter()) {
            x = module.forward(&x)?;
            if let Some(activation) = activation {
                x = activation.forward(&x)?;
            }
            if train && self.dropout > 0.0 {
                x = ops::dropout(&x, self.dropout)?;
            }
        }
        Ok(x)
    }
}

impl<M> Default for StackLayers<M>
where
    M: Module,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    #[test]
    fn test_stack_shapes_and_eval_is_deterministic() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let mut fc = StackLayers::with_dropout(0.5);
        fc.push_with_act(
            candle_nn::linear(6, 4, vb.pp("fc.0")).unwrap(),
            Activation::Relu,
        );
        fc.push(candle_nn::linear(4, 3, vb.pp("fc.1")).unwrap());
        assert_eq!(fc.len(), 2);

        let x = Tensor::randn(0f32, 1., (5, 6), &device).unwrap();
        let y1 = fc.forward_t(&x, false).unwrap();
        let y2 = fc.forward_t(&x, false).unwrap();
        assert_eq!(y1.dims(), &[5, 3]);
        assert_eq!(
            y1.to_vec2::<f32>().unwrap(),
            y2.to_vec2::<f32>().unwrap()
        );
    }
}
