//! Client request properties derived from datasource settings.

use std::time::Duration;

use azure_data_explorer_sdk::{DatasourceSettings, Properties};

/// Properties attached to every upstream request of a datasource.
#[must_use]
pub fn connection_properties(settings: &DatasourceSettings) -> Properties {
    Properties::default()
        .with_option("servertimeout", format_timespan(settings.server_timeout))
        .with_option("queryconsistency", settings.data_consistency.as_option())
        .with_option("request_readonly", true)
}

/// Render a duration as a `hh:mm:ss` timespan, truncating sub-second parts.
#[must_use]
#[allow(clippy::integer_division)]
pub fn format_timespan(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
