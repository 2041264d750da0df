pub mod bundle;
pub mod logistic;
pub mod scaler;
