pub mod activation;
pub mod error;
pub mod jacobian;
pub mod network;
mod parser;

pub use activation::{ActivationMode, sigmoid, sigmoid_tabulated, warm_up_table};
pub use error::NetError;
pub use jacobian::Jacobian;
pub use network::NeuralNet;
