//! VaeConfig - Model configuration

use serde::{Deserialize, Serialize};

/// Architecture sizes shared by an encoder/decoder pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct VaeConfig {
    #[serde(alias = "latent")]
    pub latent_size: usize,
    #[serde(alias = "state")]
    pub hidden_size: usize,
    #[serde(default = "default_num_layers")]
    pub num_layers: usize,
}

fn default_num_layers() -> usize {
    3
}

impl VaeConfig {
    pub fn new(latent_size: usize, hidden_size: usize, num_layers: usize) -> Self {
        Self {
            latent_size,
            hidden_size,
            num_layers,
        }
    }

    /// Size of the packed decoder state: internal + last output per recurrent layer.
    pub fn packed_state_size(&self) -> usize {
        2 * self.hidden_size * self.num_layers
    }
}

impl Default for VaeConfig {
    fn default() -> Self {
        Self {
            latent_size: 128,
            hidden_size: 512,
            num_layers: default_num_layers(),
        }
    }
}
