//! Export service: renders the sample table as CSV.

use std::fmt::{self, Write as _};

use chrono::{DateTime, TimeZone};

use uhilog_domain::campaign::Jobcode;
use uhilog_domain::sample::NumberedSample;
use uhilog_domain::time::from_millis;

use crate::error::ExportError;
use crate::ports::{SampleStore, SensorRegistry};
use crate::services::settings_service::SettingsService;
use crate::session::{ConnectionState, SessionSnapshot};

/// Header line of every export.
pub const CSV_HEADER: &str = "rownumber,jobcode,Timestamp,Local Date,Local Time,Temperature (\u{b0}C),Humidity (%),Latitude,Longitude,Altitude (m),Accuracy (m),Speed (MPH)";

/// A rendered export, ready to be written or delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub jobcode: Jobcode,
    /// `<jobcode>.csv`
    pub file_name: String,
    pub rows: usize,
    pub contents: String,
}

/// Application service producing CSV exports of the stored samples.
pub struct ExportService<S, R> {
    store: S,
    settings: SettingsService<R>,
}

impl<S: SampleStore, R: SensorRegistry> ExportService<S, R> {
    pub fn new(store: S, settings: SettingsService<R>) -> Self {
        Self { store, settings }
    }

    /// Render every stored sample, stamped with a jobcode built at `now`.
    ///
    /// Dates and times are rendered in the timezone of `now`.
    ///
    /// # Errors
    ///
    /// - [`ExportError::SamplingInProgress`] while the session is sampling
    /// - [`ExportError::MissingCampaign`] when campaign settings are not saved
    /// - [`ExportError::NoData`] when the table is empty
    /// - storage and settings errors
    #[tracing::instrument(skip_all)]
    pub async fn export<Tz>(
        &self,
        session: &SessionSnapshot,
        now: &DateTime<Tz>,
    ) -> Result<CsvExport, ExportError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if session.state == ConnectionState::Sampling {
            return Err(ExportError::SamplingInProgress);
        }
        let campaign = self
            .settings
            .campaign()
            .await?
            .ok_or(ExportError::MissingCampaign)?;
        let rows = self.store.numbered().await?;
        if rows.is_empty() {
            return Err(ExportError::NoData);
        }

        let jobcode = campaign.jobcode_at(now);
        let contents = render_csv(&jobcode, &rows, &now.timezone());
        tracing::info!(%jobcode, rows = rows.len(), "export rendered");

        Ok(CsvExport {
            file_name: format!("{jobcode}.csv"),
            jobcode,
            rows: rows.len(),
            contents,
        })
    }
}

/// Render `rows` as CSV with dates and times in `tz`.
pub fn render_csv<Tz>(jobcode: &Jobcode, rows: &[NumberedSample], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let jobcode = escape(jobcode.as_str());
    let mut out = String::with_capacity(CSV_HEADER.len() + rows.len() * 96);
    out.push_str(CSV_HEADER);

    for NumberedSample { row_number, sample } in rows {
        let (date, time) = match from_millis(sample.timestamp_millis, tz) {
            Some(local) => (
                local.format("%-m/%-d/%Y").to_string(),
                local.format("%H:%M:%S").to_string(),
            ),
            None => (String::new(), String::new()),
        };
        #[allow(clippy::cast_precision_loss)]
        let humidity = sample.humidity as f64;

        // writing into a String cannot fail
        let _ = write!(
            out,
            "\n{row_number},{jobcode},{},{date},{time},{:.2},{humidity:.1},{:.6},{:.6},{:.2},{:.2},{:.2}",
            sample.timestamp_millis,
            sample.temperature_celsius(),
            sample.latitude(),
            sample.longitude(),
            sample.altitude_m(),
            sample.accuracy_m(),
            sample.speed_mph(),
        );
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
