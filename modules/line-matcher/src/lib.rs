//! Finds `http(s)://host:PORT|field|field` tokens whose port is one of a configured set.

use regex::Regex;
use services::ConfigError;

/// One hit inside a line: the full token and the configured port it matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub text: &'a str,
    pub port: &'a str,
}

#[derive(Debug, Clone)]
pub struct LineMatcher {
    re: Regex,
    ports: usize,
}

impl LineMatcher {
    /// Compile a single pattern whose port alternation is the literal configured set, so
    /// unconfigured ports can never match.
    pub fn build<I, S>(ports: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut alts: Vec<String> = Vec::new();
        for p in ports {
            let p = regex::escape(p.as_ref());
            if !p.is_empty() && !alts.contains(&p) {
                alts.push(p);
            }
        }
        if alts.is_empty() {
            return Err(ConfigError::NoPortsConfigured);
        }
        let pattern = format!(r"https?://\S+:(?P<port>{})\|\S+\|\S+", alts.join("|"));
        let re = Regex::new(&pattern).map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(LineMatcher { re, ports: alts.len() })
    }

    /// Number of distinct ports the pattern was built from.
    pub fn port_count(&self) -> usize {
        self.ports
    }

    /// All non-overlapping matches in `line`, left to right.
    pub fn find_all<'a>(&'a self, line: &'a str) -> impl Iterator<Item = Match<'a>> + 'a {
        self.re.captures_iter(line).filter_map(|caps| {
            Some(Match { text: caps.get(0)?.as_str(), port: caps.name("port")?.as_str() })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(ports: &[&str]) -> LineMatcher {
        LineMatcher::build(ports.iter().copied()).unwrap()
    }

    #[test]
    fn empty_port_set_is_rejected() {
        let none: [&str; 0] = [];
        assert!(matches!(LineMatcher::build(none), Err(ConfigError::NoPortsConfigured)));
    }

    #[test]
    fn matches_configured_port() {
        let m = matcher(&["21"]);
        let hits: Vec<_> = m.find_all("http://1.2.3.4:21|user|pass").collect();
        assert_eq!(hits, vec![Match { text: "http://1.2.3.4:21|user|pass", port: "21" }]);
    }

    #[test]
    fn ignores_unconfigured_port() {
        let m = matcher(&["21", "22"]);
        assert_eq!(m.find_all("https://5.6.7.8:9999|a|b").count(), 0);
        // a prefix of a configured port is not enough
        assert_eq!(m.find_all("http://host:2|a|b").count(), 0);
        assert_eq!(m.find_all("http://host:221|a|b").count(), 0);
    }

    #[test]
    fn requires_scheme_and_two_fields() {
        let m = matcher(&["2083"]);
        assert_eq!(m.find_all("ftp://host:2083|a|b").count(), 0);
        assert_eq!(m.find_all("https://host:2083|only").count(), 0);
        assert_eq!(m.find_all("https://host:2083||b").count(), 0);
        assert_eq!(m.find_all("HTTPS://host:2083|a|b").count(), 0);
    }

    #[test]
    fn match_is_embedded_in_surrounding_text() {
        let m = matcher(&["2083"]);
        let line = "leak: https://panel.example.com:2083|admin|hunter2 (2024)\r";
        let hits: Vec<_> = m.find_all(line).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "https://panel.example.com:2083|admin|hunter2");
        assert_eq!(hits[0].port, "2083");
    }

    #[test]
    fn host_runs_to_last_colon_before_port() {
        let m = matcher(&["8443"]);
        let hits: Vec<_> = m.find_all("https://user:pw@host:8443|a|b").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].port, "8443");
        assert_eq!(hits[0].text, "https://user:pw@host:8443|a|b");
    }

    #[test]
    fn several_matches_per_line() {
        let m = matcher(&["21", "22"]);
        let line = "http://a:21|u|p https://b:22|x|y http://c:80|n|m";
        let hits: Vec<_> = m.find_all(line).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].text, hits[0].port), ("http://a:21|u|p", "21"));
        assert_eq!((hits[1].text, hits[1].port), ("https://b:22|x|y", "22"));
    }

    #[test]
    fn repeated_and_metachar_ports_are_safe() {
        let m = LineMatcher::build(["21", "21", "2.1"]).unwrap();
        assert_eq!(m.port_count(), 2);
        assert_eq!(m.find_all("http://a:2x1|u|p").count(), 0);
    }

    #[test]
    fn restartable_across_calls() {
        let m = matcher(&["22"]);
        let line = "http://a:22|u|p";
        assert_eq!(m.find_all(line).count(), 1);
        assert_eq!(m.find_all(line).count(), 1);
    }
}
