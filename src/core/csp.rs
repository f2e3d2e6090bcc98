//! Content-Security-Policy assembly from the per-environment whitelist.

use crate::domain::model::{Environment, Whitelist, WhitelistRules};

pub const DEFAULT_RULES_KEY: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    DefaultSrc,
    StyleSrc,
    FrameSrc,
    ImgSrc,
    ScriptSrc,
    ConnectSrc,
}

impl Directive {
    pub const ALL: [Directive; 6] = [
        Directive::DefaultSrc,
        Directive::StyleSrc,
        Directive::FrameSrc,
        Directive::ImgSrc,
        Directive::ScriptSrc,
        Directive::ConnectSrc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Directive::DefaultSrc => "default-src",
            Directive::StyleSrc => "style-src",
            Directive::FrameSrc => "frame-src",
            Directive::ImgSrc => "img-src",
            Directive::ScriptSrc => "script-src",
            Directive::ConnectSrc => "connect-src",
        }
    }

    /// Directives that must also allow the app's backend.
    pub fn takes_endpoint(&self) -> bool {
        matches!(
            self,
            Directive::ImgSrc | Directive::ScriptSrc | Directive::ConnectSrc
        )
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    sources: [Vec<String>; 6],
}

impl ContentSecurityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// `default` rules, then the rules of `env`, then `endpoint` on the
    /// directives that reach the backend.
    pub fn for_environment(whitelist: &Whitelist, env: Environment, endpoint: &str) -> Self {
        let mut policy = Self::new();
        for key in [DEFAULT_RULES_KEY, env.as_str()] {
            if let Some(rules) = whitelist.get(key) {
                policy.merge(rules);
            }
        }
        policy.allow_endpoint(endpoint);
        policy
    }

    /// Adds every source of `rules` not already present.
    pub fn merge(&mut self, rules: &WhitelistRules) {
        let lists = [
            (Directive::DefaultSrc, &rules.default_src),
            (Directive::StyleSrc, &rules.style_src),
            (Directive::FrameSrc, &rules.frame_src),
            (Directive::ImgSrc, &rules.img_src),
            (Directive::ScriptSrc, &rules.script_src),
            (Directive::ConnectSrc, &rules.connect_src),
        ];
        for (directive, sources) in lists {
            for source in sources {
                self.allow(directive, source);
            }
        }
    }

    pub fn allow_endpoint(&mut self, endpoint: &str) {
        for directive in Directive::ALL {
            if directive.takes_endpoint() {
                self.allow(directive, endpoint);
            }
        }
    }

    pub fn allow(&mut self, directive: Directive, source: &str) {
        let source = source.trim();
        if source.is_empty() {
            return;
        }
        let list = &mut self.sources[directive.index()];
        if !list.iter().any(|existing| existing == source) {
            list.push(source.to_string());
        }
    }

    pub fn sources(&self, directive: Directive) -> &[String] {
        &self.sources[directive.index()]
    }

    /// Header value; directives without sources are left out.
    pub fn to_header(&self) -> String {
        Directive::ALL
            .iter()
            .filter(|d| !self.sources(**d).is_empty())
            .map(|d| format!("{} {}", d.name(), self.sources(*d).join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl std::fmt::Display for ContentSecurityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist() -> Whitelist {
        serde_json::from_str(
            r#"{
                "default": {
                    "defaultSrc": ["'self'", "gap:"],
                    "styleSrc": ["'self'", "'unsafe-inline'"],
                    "imgSrc": ["'self'", "data:"],
                    "scriptSrc": ["'self'"]
                },
                "staging": {
                    "frameSrc": ["https://player.example.com"],
                    "connectSrc": ["wss://push.example.com"]
                },
                "production": {
                    "imgSrc": ["https://cdn.example.com"]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_default_and_environment_rules_are_merged() {
        let policy = ContentSecurityPolicy::for_environment(
            &whitelist(),
            Environment::Staging,
            "https://api.example.com",
        );

        assert_eq!(
            policy.to_header(),
            "default-src 'self' gap:; \
             style-src 'self' 'unsafe-inline'; \
             frame-src https://player.example.com; \
             img-src 'self' data: https://api.example.com; \
             script-src 'self' https://api.example.com; \
             connect-src wss://push.example.com https://api.example.com"
        );
    }

    #[test]
    fn test_other_environment_rules_are_ignored() {
        let policy = ContentSecurityPolicy::for_environment(&whitelist(), Environment::Testing, "*");

        assert!(policy.sources(Directive::FrameSrc).is_empty());
        assert!(!policy
            .sources(Directive::ImgSrc)
            .contains(&"https://cdn.example.com".to_string()));
        assert_eq!(policy.sources(Directive::ConnectSrc), ["*"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let whitelist = whitelist();
        let mut once = ContentSecurityPolicy::for_environment(
            &whitelist,
            Environment::Production,
            "https://api.example.com",
        );
        let header = once.to_header();

        once.merge(&whitelist["default"]);
        once.merge(&whitelist["production"]);
        once.allow_endpoint("https://api.example.com");

        assert_eq!(once.to_header(), header);
    }

    #[test]
    fn test_endpoint_already_whitelisted_is_not_repeated() {
        let mut whitelist = whitelist();
        whitelist.get_mut("default").unwrap().connect_src = vec!["*".to_string()];

        let policy = ContentSecurityPolicy::for_environment(&whitelist, Environment::Dev, "*");
        assert_eq!(policy.sources(Directive::ConnectSrc), ["*"]);
    }

    #[test]
    fn test_empty_whitelist_only_allows_endpoint() {
        let policy =
            ContentSecurityPolicy::for_environment(&Whitelist::new(), Environment::Browser, "*");
        assert_eq!(policy.to_string(), "img-src *; script-src *; connect-src *");
    }
}
