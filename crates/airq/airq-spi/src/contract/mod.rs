//! Contract module containing the collaborator traits of a forecast run

mod clock;
mod ensemble_regressor;
mod forecast_sink;
mod observation_source;

pub use clock::Clock;
pub use ensemble_regressor::EnsembleRegressor;
pub use forecast_sink::ForecastSink;
pub use observation_source::ObservationSource;
