// # Cloudflare DNS Registrar
//
// Registers a service URL as a CNAME pointing at its load balancer's DNS
// name, using the Cloudflare API v4.
//
// ## Behavior
//
// - Creates the CNAME when missing, updates it when it points elsewhere,
//   leaves it alone when it already matches
// - No retries, no caching; failures are returned to the provisioner
// - HTTP timeout configured (30 seconds)
// - Dry-run mode performs lookups and logs the intended write
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - API token MUST be provided via environment variables only
// - Registrar MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=CNAME`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use elb_core::config::RegistrarConfig;
use elb_core::traits::{DnsRegistrar, DnsRegistrarFactory};
use elb_core::{ComponentRegistry, Error, Result, Tag};
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable selecting dry-run mode
pub const MODE_ENV: &str = "ELB_DNS_MODE";

/// Existing CNAME for a name
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExistingRecord {
    id: String,
    content: String,
    proxied: bool,
    ttl: u32,
}

/// Cloudflare DNS registrar
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the registrar will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST/PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareRegistrar {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, looked up from the record name when absent)
    zone_id: Option<String>,

    /// Proxy records through Cloudflare
    proxied: bool,

    /// Record TTL in seconds (1 = automatic)
    ttl: u32,

    /// API base URL
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareRegistrar")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("proxied", &self.proxied)
            .field("ttl", &self.ttl)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareRegistrar {
    /// Create a new Cloudflare registrar
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up when absent)
    /// - `proxied`: Proxy the record through Cloudflare
    /// - `ttl`: Record TTL in seconds (1 = automatic)
    /// - `dry_run`: If true, perform GET requests but skip writes
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        proxied: bool,
        ttl: u32,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            proxied,
            ttl,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Point the registrar at another API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Get the zone ID for a record name
    ///
    /// If zone_id is set, returns it directly. Otherwise the zone is the
    /// record name without its first label.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=apps.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn get_zone_id(&self, fqdn: &str) -> Result<String> {
        if let Some(zone_id) = &self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let zone_name = match fqdn.split_once('.') {
            Some((_, zone)) if zone.contains('.') => zone,
            _ => {
                return Err(Error::config(format!("Invalid record name: {}", fqdn)));
            }
        };

        tracing::debug!("Looking up zone ID for: {}", zone_name);

        let url = format!("{}/zones", self.base_url);
        let json = self
            .get_json(&url, &[("name", zone_name)], &format!("Zone lookup for {}", zone_name))
            .await?;

        let zone = json["result"]
            .as_array()
            .ok_or_else(|| Error::dns_registrar("Invalid response format: result is not an array"))?
            .first()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

        let zone_id = zone["id"]
            .as_str()
            .ok_or_else(|| Error::dns_registrar("Invalid response format: zone.id is not a string"))?;

        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(zone_id.to_string())
    }

    /// Find the CNAME currently registered for `fqdn`
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=orders.apps.example.com&type=CNAME
    /// Authorization: Bearer <token>
    /// ```
    async fn find_record(&self, zone_id: &str, fqdn: &str) -> Result<Option<ExistingRecord>> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let json = self
            .get_json(
                &url,
                &[("name", fqdn), ("type", "CNAME")],
                &format!("Record lookup for {}", fqdn),
            )
            .await?;

        let records = json["result"]
            .as_array()
            .ok_or_else(|| Error::dns_registrar("Invalid response format: result is not an array"))?;

        let Some(record) = records.first() else {
            return Ok(None);
        };

        let id = record["id"]
            .as_str()
            .ok_or_else(|| Error::dns_registrar("Invalid response format: record.id is not a string"))?;

        Ok(Some(ExistingRecord {
            id: id.to_string(),
            content: record["content"].as_str().unwrap_or_default().to_string(),
            proxied: record["proxied"].as_bool().unwrap_or(false),
            ttl: record["ttl"]
                .as_u64()
                .and_then(|ttl| u32::try_from(ttl).ok())
                .unwrap_or(1),
        }))
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)], context: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, context));
        }

        response
            .json()
            .await
            .map_err(|e| Error::dns_registrar(format!("Failed to parse response: {}", e)))
    }

    fn record_payload(&self, fqdn: &str, target: &str, resource_name: &str) -> Value {
        serde_json::json!({
            "type": "CNAME",
            "name": fqdn,
            "content": target,
            "ttl": self.ttl,
            "proxied": self.proxied,
            "comment": format!("Load balancer {}", resource_name),
        })
    }
}

/// Map a non-success status to an error
fn status_error(status: u16, error_text: &str, context: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{}: {}", context, error_text)),
        409 => Error::dns_registrar(format!(
            "Conflict: another record already uses this name. Status: {} - {}",
            status, error_text
        )),
        429 => Error::dns_registrar(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::dns_registrar(format!(
            "Cloudflare server error (transient): {} - {}",
            status, error_text
        )),
        _ => Error::dns_registrar(format!("{} failed: {} - {}", context, status, error_text)),
    }
}

#[async_trait]
impl DnsRegistrar for CloudflareRegistrar {
    /// Upsert a CNAME from `fqdn` to `endpoint_dns_name`
    ///
    /// # API Calls
    ///
    /// ```http
    /// # Existing record
    /// GET /zones/:zone_id/dns_records?name=...&type=CNAME
    ///
    /// # Missing: create (skipped in dry-run mode)
    /// POST /zones/:zone_id/dns_records
    ///
    /// # Different target: update (skipped in dry-run mode)
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn register_dns(
        &self,
        fqdn: &str,
        endpoint_dns_name: &str,
        resource_name: &str,
        _tags: &[Tag],
    ) -> Result<()> {
        tracing::info!(
            "Registering Cloudflare CNAME: {} -> {} [mode: {}]",
            fqdn,
            endpoint_dns_name,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.get_zone_id(fqdn).await?;
        let existing = self.find_record(&zone_id, fqdn).await?;

        // Proxied records always report the automatic TTL
        if let Some(record) = &existing
            && record.content == endpoint_dns_name
            && record.proxied == self.proxied
            && (self.proxied || record.ttl == self.ttl)
        {
            tracing::info!("CNAME already up to date: {} -> {}", fqdn, endpoint_dns_name);
            return Ok(());
        }

        let payload = self.record_payload(fqdn, endpoint_dns_name, resource_name);
        let (request, url) = match &existing {
            Some(record) => {
                tracing::info!(
                    "{} CNAME: {} -> {} (was: {})",
                    if self.dry_run { "Would update" } else { "Updating" },
                    fqdn,
                    endpoint_dns_name,
                    record.content
                );
                let url = format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record.id);
                (self.client.put(&url), url)
            }
            None => {
                tracing::info!(
                    "{} CNAME: {} -> {}",
                    if self.dry_run { "Would create" } else { "Creating" },
                    fqdn,
                    endpoint_dns_name
                );
                let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
                (self.client.post(&url), url)
            }
        };

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send request to {} with payload: {}", url, payload);
            return Ok(());
        }

        let response = request
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, &format!("Writing CNAME {}", fqdn)));
        }

        tracing::info!("CNAME registered: {} -> {}", fqdn, endpoint_dns_name);
        Ok(())
    }

    fn registrar_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare registrars
pub struct CloudflareFactory;

impl DnsRegistrarFactory for CloudflareFactory {
    fn create(&self, config: &RegistrarConfig) -> Result<Box<dyn DnsRegistrar>> {
        match config {
            RegistrarConfig::Cloudflare {
                api_token,
                zone_id,
                proxied,
                ttl,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                let dry_run = std::env::var(MODE_ENV)
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Cloudflare registrar running in DRY-RUN mode - no changes will be made");
                }

                Ok(Box::new(CloudflareRegistrar::new(
                    api_token.clone(),
                    zone_id.clone(),
                    *proxied,
                    *ttl,
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare registrar")),
        }
    }
}

/// Register the Cloudflare registrar with a registry
///
/// # Example
///
/// ```rust
/// use elb_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::with_builtins();
/// elb_registrar_cloudflare::register(&registry);
/// assert!(registry.has_registrar("cloudflare"));
/// ```
pub fn register(registry: &ComponentRegistry) {
    registry.register_registrar("cloudflare", Box::new(CloudflareFactory));
}
