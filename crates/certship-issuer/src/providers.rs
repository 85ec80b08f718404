//! DNS provider registry

use std::collections::BTreeMap;

use certship_core::IssueError;
use once_cell::sync::Lazy;

/// Certbot flags for one DNS plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsProvider {
    /// Plugin selection flag. May encode several whitespace-separated
    /// tokens (godaddy ships as a third-party authenticator), so callers
    /// must split it before appending to an argv.
    pub auth_option: &'static str,
    /// Flag naming the credentials file. Certbot ignores it for route53,
    /// which reads the AWS environment; kept for table uniformity.
    pub credentials_option: &'static str,
    /// Flag naming the DNS propagation wait
    pub propagation_option: &'static str,
}

const fn plugin(
    auth_option: &'static str,
    credentials_option: &'static str,
    propagation_option: &'static str,
) -> DnsProvider {
    DnsProvider {
        auth_option,
        credentials_option,
        propagation_option,
    }
}

/// Supported DNS providers keyed by request id. Built once at first use and
/// shared read-only across concurrent jobs.
pub static PROVIDERS: Lazy<BTreeMap<&'static str, DnsProvider>> = Lazy::new(|| {
    BTreeMap::from([
        (
            "cloudflare",
            plugin(
                "--dns-cloudflare",
                "--dns-cloudflare-credentials",
                "--dns-cloudflare-propagation-seconds",
            ),
        ),
        (
            "cloudxns",
            plugin(
                "--dns-cloudxns",
                "--dns-cloudxns-credentials",
                "--dns-cloudxns-propagation-seconds",
            ),
        ),
        (
            "digitalocean",
            plugin(
                "--dns-digitalocean",
                "--dns-digitalocean-credentials",
                "--dns-digitalocean-propagation-seconds",
            ),
        ),
        (
            "dnsimple",
            plugin(
                "--dns-dnsimple",
                "--dns-dnsimple-credentials",
                "--dns-dnsimple-propagation-seconds",
            ),
        ),
        (
            "dnsmadeeasy",
            plugin(
                "--dns-dnsmadeeasy",
                "--dns-dnsmadeeasy-credentials",
                "--dns-dnsmadeeasy-propagation-seconds",
            ),
        ),
        (
            "gehirn",
            plugin(
                "--dns-gehirn",
                "--dns-gehirn-credentials",
                "--dns-gehirn-propagation-seconds",
            ),
        ),
        (
            "godaddy",
            plugin(
                // two tokens, certbot takes the plugin name as a value here
                "--authenticator dns-godaddy",
                "--dns-godaddy-credentials",
                "--dns-godaddy-propagation-seconds",
            ),
        ),
        (
            "google",
            plugin(
                "--dns-google",
                "--dns-google-credentials",
                "--dns-google-propagation-seconds",
            ),
        ),
        (
            "linode",
            plugin(
                "--dns-linode",
                "--dns-linode-credentials",
                "--dns-linode-propagation-seconds",
            ),
        ),
        (
            "luadns",
            plugin(
                "--dns-luadns",
                "--dns-luadns-credentials",
                "--dns-luadns-propagation-seconds",
            ),
        ),
        (
            "nsone",
            plugin(
                "--dns-nsone",
                "--dns-nsone-credentials",
                "--dns-nsone-propagation-seconds",
            ),
        ),
        (
            "ovh",
            plugin(
                "--dns-ovh",
                "--dns-ovh-credentials",
                "--dns-ovh-propagation-seconds",
            ),
        ),
        (
            "rfc2136",
            plugin(
                "--dns-rfc2136",
                "--dns-rfc2136-credentials",
                "--dns-rfc2136-propagation-seconds",
            ),
        ),
        (
            "route53",
            plugin(
                "--dns-route53",
                "--dns-route53-credentials",
                "--dns-route53-propagation-seconds",
            ),
        ),
        (
            "sakuracloud",
            plugin(
                "--dns-sakuracloud",
                "--dns-sakuracloud-credentials",
                "--dns-sakuracloud-propagation-seconds",
            ),
        ),
    ])
});

/// Look up a provider by id. Request validation rejects unknown ids before
/// issuance starts; the registry still guards against being called with one.
pub fn lookup(provider: &str) -> Result<&'static DnsProvider, IssueError> {
    PROVIDERS
        .get(provider)
        .ok_or_else(|| IssueError::UnknownProvider(provider.to_string()))
}

/// Registry ids in sorted order, as listed in validation messages
pub fn sorted_provider_ids() -> Vec<&'static str> {
    PROVIDERS.keys().copied().collect()
}
