//! Turns user-supplied strings and config values into a validated
//! [`ScanConfig`] and display options.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use std::path::PathBuf;

use hoard_core::platform;
use hoard_core::{
    AppConfig, Error, ExtensionFilter, ScanConfig, SortDirection, SortKey, Tier, TierFilter,
    ViewOptions,
};

use crate::commands::{ScanArgs, ViewArgs};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Seconds added to a day's midnight to reach its last second.
const END_OF_DAY_SECS: i64 = 86_399;

pub fn parse_extensions(raw: &str) -> ExtensionFilter {
    ExtensionFilter::from_list(raw.split(','))
}

pub fn parse_fragments(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_megabytes(raw: &str) -> Result<u64, Error> {
    let mb: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a number of megabytes", raw)))?;
    megabytes_to_bytes(mb)
}

pub fn megabytes_to_bytes(mb: f64) -> Result<u64, Error> {
    if !mb.is_finite() || mb < 0.0 {
        return Err(Error::InvalidInput(format!(
            "size must be a non-negative number of megabytes, got {}",
            mb
        )));
    }
    Ok((mb * BYTES_PER_MB) as u64)
}

/// Local midnight at the start of a `YYYY-MM-DD` day.
pub fn parse_day_start(raw: &str) -> Result<DateTime<Utc>, Error> {
    let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a YYYY-MM-DD date", raw)))?;
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(|| {
        Error::InvalidInput(format!("'{}' has no midnight", raw))
    })?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| Error::InvalidInput(format!("'{}' does not exist in local time", raw)))
}

/// Last second of a `YYYY-MM-DD` day, so the range includes the whole day.
pub fn parse_day_end(raw: &str) -> Result<DateTime<Utc>, Error> {
    Ok(parse_day_start(raw)? + Duration::seconds(END_OF_DAY_SECS))
}

pub fn parse_tiers(raw: &str) -> Result<TierFilter, Error> {
    let tiers = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<Tier>().map_err(Error::InvalidInput))
        .collect::<Result<Vec<Tier>, Error>>()?;
    Ok(TierFilter::only(&tiers))
}

/// Command-line flags layered over configuration values.
pub fn build_scan_config(app: &AppConfig, args: &ScanArgs) -> Result<ScanConfig, Error> {
    let root = match &args.root {
        Some(root) => root.clone(),
        None if !app.root.trim().is_empty() => PathBuf::from(app.root.trim()),
        None => platform::default_root(),
    };

    let mut config = ScanConfig::new(root);
    config.extensions = match &args.ext {
        Some(raw) => parse_extensions(raw),
        None => ExtensionFilter::from_list(&app.extensions),
    };
    config.min_size_bytes = match &args.min_mb {
        Some(raw) => parse_megabytes(raw)?,
        None => megabytes_to_bytes(app.min_size_mb)?,
    };
    config.skip_hidden = app.skip_hidden && !args.include_hidden;
    config.follow_symlinks = app.follow_symlinks || args.follow_symlinks;
    config.same_filesystem_only = app.same_filesystem_only && !args.cross_filesystems;
    config.excluded_dir_names = app
        .excluded_dir_names
        .iter()
        .chain(args.exclude_dir.iter())
        .cloned()
        .collect();

    config.excluded_path_fragments = app.excluded_paths.clone();
    if let Some(raw) = &args.exclude {
        config.excluded_path_fragments.extend(parse_fragments(raw));
    }

    config.created_after = args
        .created_after
        .as_deref()
        .map(parse_day_start)
        .transpose()?;
    config.created_before = args
        .created_before
        .as_deref()
        .map(parse_day_end)
        .transpose()?;
    if let (Some(after), Some(before)) = (config.created_after, config.created_before) {
        if after > before {
            return Err(Error::InvalidInput(
                "--created-after is later than --created-before".to_string(),
            ));
        }
    }

    Ok(config.normalized())
}

pub fn build_view_options(app: &AppConfig, args: &ViewArgs) -> Result<ViewOptions, Error> {
    let mut options = ViewOptions::default();
    if let Some(raw) = &args.sort {
        let key: SortKey = raw.parse().map_err(Error::InvalidInput)?;
        options.sort = key;
        options.direction = key.default_direction();
    }
    if args.asc {
        options.direction = SortDirection::Ascending;
    } else if args.desc {
        options.direction = SortDirection::Descending;
    }
    if let Some(raw) = &args.show {
        options.tiers = parse_tiers(raw)?;
    }
    let top = args.top.unwrap_or(app.top_n);
    options.top_n = (top > 0).then_some(top);
    Ok(options)
}
