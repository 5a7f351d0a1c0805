//! Geolocation lookup for filling a proxy's `location` hint from an MMDB file

use crate::{HarvestError, Result};
use maxminddb::{geoip2, Reader};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Country and city of an IP address
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeoLocation {
    /// ISO 3166-1 alpha-2 country code (e.g., "US", "CN")
    pub country_code: Option<String>,
    /// City name in English
    pub city_name: Option<String>,
}

impl GeoLocation {
    /// Location hint as stored on a record: "City, CC", "CC" or "City"
    pub fn hint(&self) -> Option<String> {
        match (&self.country_code, &self.city_name) {
            (Some(cc), Some(city)) => Some(format!("{}, {}", city, cc)),
            (Some(cc), None) => Some(cc.clone()),
            (None, Some(city)) => Some(city.clone()),
            (None, None) => None,
        }
    }
}

/// Shared MMDB reader
#[derive(Clone)]
pub struct GeoLocator {
    reader: Arc<Reader<Vec<u8>>>,
}

impl GeoLocator {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(geo_error)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Look up a host. Host names that are not IP literals have no location.
    pub fn lookup(&self, host: &str) -> Result<GeoLocation> {
        match host.parse::<IpAddr>() {
            Ok(ip) => self.lookup_ip(ip),
            Err(_) => Ok(GeoLocation::default()),
        }
    }

    pub fn lookup_ip(&self, ip: IpAddr) -> Result<GeoLocation> {
        let lookup_result = self.reader.lookup(ip).map_err(geo_error)?;
        let city: Option<geoip2::City> = lookup_result.decode().map_err(geo_error)?;

        let Some(city) = city else {
            return Ok(GeoLocation::default());
        };

        Ok(GeoLocation {
            country_code: city.country.iso_code.map(String::from),
            city_name: city.city.names.english.map(String::from),
        })
    }
}

fn geo_error(err: maxminddb::MaxMindDbError) -> HarvestError {
    HarvestError::Geo(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_formats() {
        assert_eq!(GeoLocation::default().hint(), None);

        let mut loc = GeoLocation {
            country_code: Some("US".to_string()),
            city_name: None,
        };
        assert_eq!(loc.hint().as_deref(), Some("US"));

        loc.city_name = Some("New York".to_string());
        assert_eq!(loc.hint().as_deref(), Some("New York, US"));

        loc.country_code = None;
        assert_eq!(loc.hint().as_deref(), Some("New York"));
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let err = GeoLocator::from_path("/nonexistent/GeoLite2-City.mmdb")
            .err()
            .unwrap();
        assert!(matches!(err, HarvestError::Geo(_)));
        assert!(err.to_string().starts_with("Geolocation error"));
    }

    #[test]
    fn test_corrupt_database_is_a_geo_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an mmdb file").unwrap();
        let err = GeoLocator::from_path(file.path()).err().unwrap();
        assert!(matches!(err, HarvestError::Geo(_)));
    }
}
