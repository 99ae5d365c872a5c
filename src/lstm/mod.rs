/*!
The sequence model: stacked LSTM layers followed by a linear read-out of the last time step
*/

use crate::config::LstmConfig;
use tch::nn::{self, Linear, Module, ModuleT, RNNConfig, VarStore, LSTM, RNN};
use tch::Tensor;

/// A stacked LSTM regressing one scalar per input sequence
#[derive(Debug)]
pub struct LstmNet {
    /// The number of features per time step
    pub d_feat: usize,
    /// The hidden size of every LSTM layer
    pub hidden: usize,
    /// Dropout applied to the input of every LSTM layer but the first, while training
    pub dropout: f64,
    /// This model's LSTM layers, first to last
    pub lstm_layers: Vec<LSTM>,
    /// This model's linear layer
    pub linear_layer: Linear,
}

impl LstmNet {
    /// Run the LSTM stack over a batch-first `[batch, seq, d_feat]` input, returning the hidden
    /// state of every time step as `[batch, seq, hidden]`
    pub fn hidden_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let mut hidden = xs.shallow_clone();
        for (i, layer) in self.lstm_layers.iter().enumerate() {
            if i > 0 {
                hidden = hidden.dropout(self.dropout, train);
            }
            let (output, _state) = layer.seq(&hidden);
            hidden = output;
        }
        hidden
    }
}

impl ModuleT for LstmNet {
    /// Predict one value per sequence of a `[batch, seq, d_feat]` input, yielding `[batch]`
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let last = self.hidden_t(xs, train).select(1, -1);
        self.linear_layer.forward(&last).squeeze_dim(-1)
    }
}

/// A descriptor for an instance of the `LstmNet` model
#[derive(Debug, Clone, PartialEq)]
pub struct LstmNetDesc {
    /// The number of input features per time step
    pub d_feat: usize,
    /// The size of the hidden LSTM layers to use
    pub hidden: usize,
    /// The number of hidden LSTM layers to use, at least one
    pub layers: usize,
    /// Dropout between LSTM layers
    pub dropout: f64,
}

impl From<&LstmConfig> for LstmNetDesc {
    fn from(config: &LstmConfig) -> LstmNetDesc {
        LstmNetDesc {
            d_feat: config.d_feat,
            hidden: config.hidden_size,
            layers: config.num_layers,
            dropout: config.dropout,
        }
    }
}

impl LstmNetDesc {
    /// Build an `LstmNet` over a given `VarStore`
    pub fn build(&self, vs: &VarStore) -> LstmNet {
        let root = vs.root();
        let lstm_layers = (0..self.layers)
            .map(|i| {
                let inputs = if i == 0 { self.d_feat } else { self.hidden };
                nn::lstm(
                    &(&root / "rnn" / i),
                    inputs as i64,
                    self.hidden as i64,
                    RNNConfig {
                        has_biases: true,
                        num_layers: 1,
                        dropout: 0.,
                        train: true,
                        bidirectional: false,
                        batch_first: true,
                    },
                )
            })
            .collect();
        let linear_layer = nn::linear(
            &root / "fc_out",
            self.hidden as i64,
            1,
            Default::default(),
        );
        LstmNet {
            d_feat: self.d_feat,
            hidden: self.hidden,
            dropout: self.dropout,
            lstm_layers,
            linear_layer,
        }
    }
}
