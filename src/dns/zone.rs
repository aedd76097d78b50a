use crate::config::Config;
use crate::error::Error;
use hickory_server::proto::rr::rdata::{A, AAAA, CNAME, NS, SOA, TXT};
use hickory_server::proto::rr::{LowerName, Name, RData, Record, RecordType};
use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::net::IpAddr;
use time::macros::format_description;
use time::OffsetDateTime;

// See RIPE 203[0] for recommended values.
// [0]: https://www.ripe.net/publications/docs/ripe-203
const SOA_REFRESH: i32 = 28_800; // 8 hrs.
const SOA_RETRY: i32 = 7_200; // 2 hrs.
const SOA_EXPIRE: i32 = 604_800; // 1 week.
const SOA_MINIMUM: u32 = 86_400; // 1 day.

const OWN_CHALLENGE_LABEL: &str = "_acme-challenge";

lazy_static! {
    static ref SERIAL_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day][hour]");
}

/// Static records served for the configured domain, keyed by exact owner name.
///
/// Built once from the [`Config`] before any listener starts and read-only afterwards. All owner
/// names are fully qualified and lower case.
#[derive(Debug, Clone)]
pub struct Zone {
    domain: LowerName,
    own_challenge: LowerName,
    records: BTreeMap<LowerName, Vec<Record>>,
    soa: Record,
}

impl Zone {
    /// Build the zone from the static record maps of a [`Config`] plus a synthesized SOA for
    /// [`Config::domain`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DNSError`] if the SOA admin address or the own challenge name aren't
    /// valid DNS names.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let domain = fqdn(&config.domain);
        let own_challenge = Name::from_ascii(OWN_CHALLENGE_LABEL)?.append_domain(&domain)?;

        let mut ns_admin = config.ns_admin()?;
        ns_admin.set_fqdn(true);
        let soa = Record::from_rdata(
            domain.clone(),
            config.static_ttl,
            RData::SOA(SOA::new(
                fqdn(&config.ns_domain),
                ns_admin,
                zone_serial(OffsetDateTime::now_utc()),
                SOA_REFRESH,
                SOA_RETRY,
                SOA_EXPIRE,
                SOA_MINIMUM,
            )),
        );

        let mut zone = Zone {
            domain: domain.into(),
            own_challenge: own_challenge.into(),
            records: BTreeMap::default(),
            soa: soa.clone(),
        };
        zone.insert(soa);

        let ttl = config.static_ttl;
        for (name, addrs) in &config.addrs {
            for ip in addrs {
                let rdata = match ip {
                    IpAddr::V4(v4) => RData::A(A(*v4)),
                    IpAddr::V6(v6) => RData::AAAA(AAAA(*v6)),
                };
                zone.insert(Record::from_rdata(fqdn(name), ttl, rdata));
            }
        }
        for (name, targets) in &config.ns_records {
            for target in targets {
                let rdata = RData::NS(NS(fqdn(target)));
                zone.insert(Record::from_rdata(fqdn(name), ttl, rdata));
            }
        }
        for (name, target) in &config.cname_records {
            let rdata = RData::CNAME(CNAME(fqdn(target)));
            zone.insert(Record::from_rdata(fqdn(name), ttl, rdata));
        }
        for (name, values) in &config.txt_records {
            for value in values {
                let rdata = RData::TXT(TXT::new(vec![value.clone()]));
                zone.insert(Record::from_rdata(fqdn(name), ttl, rdata));
            }
        }

        tracing::debug!(
            "built zone for {} with {} owner names",
            zone.domain,
            zone.records.len()
        );
        Ok(zone)
    }

    fn insert(&mut self, record: Record) {
        self.records
            .entry(LowerName::from(record.name()))
            .or_default()
            .push(record);
    }

    /// The synthesized SOA record for the configured domain.
    #[must_use]
    pub fn soa(&self) -> &Record {
        &self.soa
    }

    /// True if `name` is the zone's domain or an owner name of a static record.
    #[must_use]
    pub fn answering_for(&self, name: &LowerName) -> bool {
        *name == self.domain || self.records.contains_key(name)
    }

    /// True if `name`, or any of its parent names, is one [`Zone::answering_for`] is true for.
    #[must_use]
    pub fn is_authoritative(&self, name: &LowerName) -> bool {
        let mut name = name.clone();
        loop {
            if self.answering_for(&name) {
                return true;
            }
            if name.is_root() {
                return false;
            }
            name = name.base_name();
        }
    }

    /// True only for `_acme-challenge.<domain>`.
    #[must_use]
    pub fn is_own_challenge(&self, name: &LowerName) -> bool {
        *name == self.own_challenge
    }

    /// The static records of type `record_type` owned by exactly `name`. When there are none
    /// but `name` owns a CNAME, the CNAME is returned instead.
    #[must_use]
    pub fn lookup(&self, name: &LowerName, record_type: RecordType) -> Vec<Record> {
        let Some(records) = self.records.get(name) else {
            return Vec::default();
        };
        let matching = Self::of_type(records, record_type);
        if matching.is_empty() {
            Self::of_type(records, RecordType::CNAME)
        } else {
            matching
        }
    }

    fn of_type(records: &[Record], record_type: RecordType) -> Vec<Record> {
        records
            .iter()
            .filter(|r| r.record_type() == record_type)
            .cloned()
            .collect()
    }
}

fn fqdn(name: &LowerName) -> Name {
    let mut name = Name::from(name);
    name.set_fqdn(true);
    name
}

/// The SOA serial for `now`, in `YYYYMMDDHH` form.
fn zone_serial(now: OffsetDateTime) -> u32 {
    // Ten decimal digits starting with a four digit year always fit a u32.
    now.format(&SERIAL_FORMATTER)
        .ok()
        .and_then(|serial| serial.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use time::macros::datetime;

    fn zone() -> Zone {
        let config: Config = serde_json::from_value(json!({
            "domain": "Auth.Example.org",
            "ns_domain": "ns1.auth.example.org",
            "ns_admin": "admin@example.org",
            "api_bind_addr": "127.0.0.1:8080",
            "api_timeout": 5,
            "dns_udp_bind_addr": "127.0.0.1:5353",
            "dns_tcp_timeout": 10,
            "static_ttl": 300,
            "addrs": { "ns1.auth.example.org": ["192.0.2.53", "2001:db8::53"] },
            "ns_records": { "auth.example.org": ["ns1.auth.example.org"] },
            "cname_records": { "www.auth.example.org.": "ns1.auth.example.org" },
            "txt_records": { "auth.example.org": ["v=static"] },
        }))
        .unwrap();
        Zone::from_config(&config).unwrap()
    }

    fn name(s: &str) -> LowerName {
        LowerName::from_str(s).unwrap()
    }

    #[test]
    fn serial_is_date_and_hour() {
        assert_eq!(zone_serial(datetime!(2023-03-12 17:45 UTC)), 2_023_031_217);
    }

    #[test]
    fn soa_uses_configured_names() {
        let zone = zone();
        let soa = zone.soa();
        assert_eq!(soa.ttl(), 300);
        let Some(RData::SOA(data)) = soa.data() else {
            panic!("not a SOA record: {soa:?}");
        };
        assert_eq!(data.mname(), &Name::from_str("ns1.auth.example.org.").unwrap());
        assert_eq!(data.rname(), &Name::from_str("admin.example.org.").unwrap());
        assert_eq!(data.minimum(), SOA_MINIMUM);
        assert_eq!(
            zone.lookup(&name("auth.example.org."), RecordType::SOA),
            vec![soa.clone()]
        );
    }

    #[test]
    fn lookup_filters_by_type() {
        let zone = zone();
        let host = name("NS1.auth.example.org");
        let a = zone.lookup(&host, RecordType::A);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].data(), Some(&RData::A(A::new(192, 0, 2, 53))));
        assert_eq!(zone.lookup(&host, RecordType::AAAA).len(), 1);
        assert!(zone.lookup(&host, RecordType::TXT).is_empty());
    }

    #[test]
    fn lookup_falls_back_to_cname() {
        let zone = zone();
        let records = zone.lookup(&name("www.auth.example.org"), RecordType::A);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type(), RecordType::CNAME);
    }

    #[test]
    fn authority_walks_parent_names() {
        let zone = zone();
        assert!(zone.answering_for(&name("auth.example.org")));
        assert!(!zone.answering_for(&name("deep.sub.auth.example.org")));
        assert!(zone.is_authoritative(&name("deep.sub.auth.example.org")));
        assert!(!zone.is_authoritative(&name("example.org")));
        assert!(!zone.is_authoritative(&name("unrelated.test")));
    }

    #[test]
    fn own_challenge_is_exact() {
        let zone = zone();
        assert!(zone.is_own_challenge(&name("_ACME-Challenge.auth.example.org.")));
        assert!(zone.is_own_challenge(&name("_acme-challenge.auth.example.org")));
        assert!(!zone.is_own_challenge(&name("_acme-challenge.x.auth.example.org")));
        assert!(!zone.is_own_challenge(&name("auth.example.org")));
    }
}
