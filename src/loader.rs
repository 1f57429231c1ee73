use rusqlite::{params, Connection};
use slog::{debug, o};
use std::collections::BTreeMap;

use crate::error::LoadError;
use crate::logging::DEFAULT;
use crate::model::Series;

// Number of US TV seasons airing per year, "year:count"
pub const US_TV_SEASONS: &[&str] = &[
    "1950:1", "1951:2", "1952:2", "1953:2", "1954:2", "1955:3", "1956:4", "1957:4",
    "1958:4", "1959:7", "1960:11", "1961:11", "1962:10", "1963:10", "1964:8", "1965:6",
    "1966:7", "1967:9", "1968:11", "1969:11", "1970:10", "1971:10", "1972:13", "1973:12",
    "1974:13", "1975:16", "1976:22", "1977:26", "1978:26", "1979:27", "1980:24", "1981:23",
    "1982:23", "1983:22", "1984:18", "1985:19", "1986:21", "1987:28", "1988:33", "1989:38",
    "1990:41", "1991:41", "1992:39", "1993:41", "1994:48", "1995:55", "1996:59", "1997:66",
    "1998:69", "1999:67", "2000:72", "2001:79", "2002:95", "2003:103", "2004:121", "2005:142",
    "2006:164", "2007:169", "2008:185", "2009:218", "2010:226", "2011:245", "2012:247",
    "2013:248", "2014:253", "2015:251", "2016:236", "2017:235", "2018:235", "2019:215",
    "2020:170", "2021:168", "2022:165", "2023:119",
];

pub fn tv_seasons() -> Result<Series, LoadError> {
    parse_entries(US_TV_SEASONS.iter().copied())
}

/// Build a series from `"year:count"` entries. Entries whose year is not all
/// digits are skipped; a repeated year keeps its last count.
pub fn parse_entries<'a, I>(entries: I) -> Result<Series, LoadError>
where
    I: IntoIterator<Item = &'a str>,
{
    let log = DEFAULT.new(o!("function" => "parse_entries"));
    let mut by_year = BTreeMap::new();

    for entry in entries {
        let (year, count) = entry.split_once(':').ok_or_else(|| LoadError::Parse {
            entry: entry.to_string(),
            reason: "expected year:count".to_string(),
        })?;

        let year = year.trim();
        if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
            debug!(log, "skipping entry without a numeric year"; "entry" => entry);
            continue;
        }

        let period: i32 = year.parse().map_err(|_| LoadError::Parse {
            entry: entry.to_string(),
            reason: "year out of range".to_string(),
        })?;
        let value: f64 = count.trim().parse().map_err(|_| LoadError::Parse {
            entry: entry.to_string(),
            reason: "count is not a number".to_string(),
        })?;

        by_year.insert(period, value);
    }

    Ok(Series::from_pairs(by_year)?)
}

pub fn load_series(db_path: &str, name: &str) -> Result<Series, LoadError> {
    let conn = Connection::open(db_path)?;
    load_series_from(&conn, name)
}

/// Read `(period, value)` rows for `name` from the `observations` table.
pub fn load_series_from(conn: &Connection, name: &str) -> Result<Series, LoadError> {
    let mut stmt = conn.prepare(
        "SELECT period, value
         FROM observations
         WHERE series = ?1
         ORDER BY period",
    )?;

    let rows = stmt.query_map(params![name], |row| {
        Ok((row.get::<_, i32>(0)?, row.get::<_, f64>(1)?))
    })?;

    let pairs = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(DEFAULT, "loaded series"; "series" => name, "rows" => pairs.len());
    Ok(Series::from_pairs(pairs)?)
}
