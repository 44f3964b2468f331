use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Unknown observation variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown optical band: {0}")]
    UnknownBand(String),

    #[error("The survey must be reset before stepping")]
    EpisodeNotStarted,

    #[error("The episode has terminated; call reset before stepping again")]
    EpisodeTerminated,

    #[error("Invalid weather source: {0}")]
    WeatherSource(String),

    #[error("CSV reading error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unable to read the system clock: {0}")]
    Clock(String),
}

impl PartialEq for SurveyError {
    fn eq(&self, other: &Self) -> bool {
        use SurveyError::*;
        match (self, other) {
            (Configuration(a), Configuration(b)) => a == b,
            (InvalidAction(a), InvalidAction(b)) => a == b,
            (UnknownVariable(a), UnknownVariable(b)) => a == b,
            (UnknownBand(a), UnknownBand(b)) => a == b,
            (WeatherSource(a), WeatherSource(b)) => a == b,
            (Clock(a), Clock(b)) => a == b,

            // foreign errors are not comparable: same variant is enough
            (CsvError(_), CsvError(_)) => true,
            (IoError(_), IoError(_)) => true,

            (EpisodeNotStarted, EpisodeNotStarted) => true,
            (EpisodeTerminated, EpisodeTerminated) => true,

            _ => false,
        }
    }
}
