// # elbpush - Load Balancer Provisioning
//
// Thin integration layer over elb-core. Provisioning logic lives in the
// library; this binary only:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the runtime
// 3. Registers control planes and DNS registrars
// 4. Runs one provisioning pass for a push definition
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Inputs
// - `ELB_PUSH_DEFINITION`: Path to the push definition JSON
// - `ELB_CLUSTER_METADATA`: Path to the cluster metadata JSON
// - `ELB_CLUSTER_TAG_KEY`: Tag key receiving the cluster name (default: Cluster)
//
// ### Certificates
// - `ELB_CERTIFICATE_ARN`: Certificate presented by HTTPS listeners (required)
// - `ELB_PUBLIC_URL_SUFFIXES`: Comma-separated URL suffixes served to the internet
//
// ### Control Plane
// - `ELB_CONTROL_PLANE`: Control plane type (aws, memory)
// - `AWS_REGION`: Region (default: us-east-1)
// - `ELB_ENDPOINT`: Endpoint override (optional)
// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`: Credentials
//
// ### DNS Registrar
// - `ELB_DNS_REGISTRAR`: Registrar type (cloudflare, disabled)
// - `ELB_DNS_API_TOKEN`: API token
// - `ELB_DNS_ZONE_ID`: Zone ID (optional)
// - `ELB_DNS_PROXIED`: Proxy the record (default: false)
// - `ELB_DNS_TTL`: Record TTL in seconds (default: 300)
// - `ELB_DNS_MODE`: `dry-run` to skip DNS writes
//
// ## Example
//
// ```bash
// export ELB_PUSH_DEFINITION=./push.json
// export ELB_CLUSTER_METADATA=./cluster.json
// export ELB_CERTIFICATE_ARN=arn:aws:acm:us-east-1:123456789012:certificate/abc
// export ELB_PUBLIC_URL_SUFFIXES=example.com
// export ELB_DNS_REGISTRAR=cloudflare
// export ELB_DNS_API_TOKEN=your_token
//
// elbpush
// ```

use anyhow::{Context, Result};
use elb_core::config::{ControlPlaneConfig, ProvisionConfig, ProvisionerSettings, RegistrarConfig};
use elb_core::{
    ClusterMetadata, ComponentRegistry, FirstExposedPortResolver, LoadBalancerProvisioner,
    ProvisionEvent, PushDefinition, StaticCertResolver,
};
use std::env;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Load balancer provisioned
/// - 1: Configuration or startup error
/// - 2: Provisioning failed
#[derive(Debug, Clone, Copy)]
enum ElbPushExitCode {
    /// Load balancer provisioned
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Provisioning failed part-way
    ProvisionFailed = 2,
}

impl From<ElbPushExitCode> for ExitCode {
    fn from(code: ElbPushExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    push_definition: String,
    cluster_metadata: String,
    cluster_tag_key: String,
    certificate_arn: String,
    public_url_suffixes: Vec<String>,
    control_plane: String,
    region: String,
    endpoint: Option<String>,
    dns_registrar: String,
    dns_api_token: Option<String>,
    dns_zone_id: Option<String>,
    dns_proxied: bool,
    dns_ttl: u32,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            push_definition: env::var("ELB_PUSH_DEFINITION").context("ELB_PUSH_DEFINITION is required")?,
            cluster_metadata: env::var("ELB_CLUSTER_METADATA").context("ELB_CLUSTER_METADATA is required")?,
            cluster_tag_key: env::var("ELB_CLUSTER_TAG_KEY").unwrap_or_else(|_| "Cluster".to_string()),
            certificate_arn: env::var("ELB_CERTIFICATE_ARN").context("ELB_CERTIFICATE_ARN is required")?,
            public_url_suffixes: split_list(&env::var("ELB_PUBLIC_URL_SUFFIXES").unwrap_or_default()),
            control_plane: env::var("ELB_CONTROL_PLANE").unwrap_or_else(|_| "aws".to_string()),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("ELB_ENDPOINT").ok().filter(|s| !s.is_empty()),
            dns_registrar: env::var("ELB_DNS_REGISTRAR").unwrap_or_else(|_| "disabled".to_string()),
            dns_api_token: env::var("ELB_DNS_API_TOKEN").ok(),
            dns_zone_id: env::var("ELB_DNS_ZONE_ID").ok().filter(|s| !s.is_empty()),
            dns_proxied: match env::var("ELB_DNS_PROXIED") {
                Ok(s) => s
                    .parse()
                    .with_context(|| format!("ELB_DNS_PROXIED must be true or false. Got: {}", s))?,
                Err(_) => false,
            },
            dns_ttl: match env::var("ELB_DNS_TTL") {
                Ok(s) => s
                    .parse()
                    .with_context(|| format!("ELB_DNS_TTL must be a number of seconds. Got: {}", s))?,
                Err(_) => 300,
            },
            log_level: env::var("ELB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate what the library cannot check on its own
    fn validate(&self) -> Result<()> {
        if self.certificate_arn.trim().is_empty() {
            anyhow::bail!(
                "ELB_CERTIFICATE_ARN is required. \
                Set it via: export ELB_CERTIFICATE_ARN=arn:aws:acm:..."
            );
        }

        match self.control_plane.as_str() {
            "aws" | "memory" => {}
            _ => anyhow::bail!(
                "ELB_CONTROL_PLANE '{}' is not supported. \
                Supported types: aws, memory",
                self.control_plane
            ),
        }

        match self.dns_registrar.as_str() {
            "cloudflare" => {
                if self.dns_api_token.as_ref().is_none_or(|t| t.is_empty()) {
                    anyhow::bail!(
                        "ELB_DNS_API_TOKEN is required when ELB_DNS_REGISTRAR=cloudflare. \
                        Set it via: export ELB_DNS_API_TOKEN=your_token"
                    );
                }
            }
            "disabled" => {}
            _ => anyhow::bail!(
                "ELB_DNS_REGISTRAR '{}' is not supported. \
                Supported registrars: cloudflare, disabled",
                self.dns_registrar
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ELB_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.provision_config().validate()?;
        Ok(())
    }

    fn provision_config(&self) -> ProvisionConfig {
        let control_plane = match self.control_plane.as_str() {
            "memory" => ControlPlaneConfig::Memory,
            _ => ControlPlaneConfig::Aws {
                region: self.region.clone(),
                endpoint: self.endpoint.clone(),
            },
        };

        let registrar = match self.dns_registrar.as_str() {
            "cloudflare" => RegistrarConfig::Cloudflare {
                api_token: self.dns_api_token.clone().unwrap_or_default(),
                zone_id: self.dns_zone_id.clone(),
                proxied: self.dns_proxied,
                ttl: self.dns_ttl,
            },
            _ => RegistrarConfig::Disabled,
        };

        ProvisionConfig {
            cluster_tag_key: self.cluster_tag_key.clone(),
            control_plane,
            registrar,
            provisioner: ProvisionerSettings::default(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ElbPushExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return ElbPushExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ElbPushExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ElbPushExitCode::ConfigError.into();
        }
    };

    let code = rt.block_on(async {
        let push = match Push::prepare(&config).await {
            Ok(push) => push,
            Err(e) => {
                error!("Setup error: {:#}", e);
                return ElbPushExitCode::ConfigError;
            }
        };

        match push.run().await {
            Ok(()) => ElbPushExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                ElbPushExitCode::ProvisionFailed
            }
        }
    });

    code.into()
}

/// Everything one provisioning pass needs
struct Push {
    provisioner: LoadBalancerProvisioner,
    events: mpsc::Receiver<ProvisionEvent>,
    cluster: ClusterMetadata,
    definition: PushDefinition,
}

impl Push {
    /// Load inputs and wire components
    async fn prepare(config: &Config) -> Result<Self> {
        let registry = ComponentRegistry::with_builtins();

        #[cfg(feature = "aws")]
        elb_control_aws::register(&registry);

        #[cfg(feature = "cloudflare")]
        elb_registrar_cloudflare::register(&registry);

        let provision_config = config.provision_config();
        let api = registry.create_control_plane(&provision_config.control_plane)?;
        let registrar = registry.create_registrar(&provision_config.registrar)?;
        info!(
            "Control plane: {}, DNS registrar: {}",
            api.api_name(),
            registrar.registrar_name()
        );

        let definition = PushDefinition::load(&config.push_definition)
            .await
            .with_context(|| format!("Loading push definition {}", config.push_definition))?;
        let cluster = ClusterMetadata::load(&config.cluster_metadata)
            .await
            .with_context(|| format!("Loading cluster metadata {}", config.cluster_metadata))?;

        let cert_resolver = StaticCertResolver::new(
            config.certificate_arn.clone(),
            config.public_url_suffixes.clone(),
        );

        let (provisioner, events) = LoadBalancerProvisioner::new(
            api,
            Box::new(cert_resolver),
            Box::new(FirstExposedPortResolver),
            registrar,
            &provision_config,
        )?;

        Ok(Self {
            provisioner,
            events,
            cluster,
            definition,
        })
    }

    /// Provision and report
    async fn run(self) -> Result<()> {
        let Self {
            provisioner,
            mut events,
            cluster,
            definition,
        } = self;

        let event_logger = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!("Provision event: {:?}", event);
            }
        });

        let outcome = provisioner.create_load_balancer(&cluster, &definition).await;

        // Closing the sender ends the logger
        drop(provisioner);
        let _ = event_logger.await;

        let result = outcome?;
        info!("Load balancer result: {}", serde_json::to_string(&result)?);
        info!("Done!");
        Ok(())
    }
}
