//! Load balancer provisioner
//!
//! The LoadBalancerProvisioner is responsible for:
//! - Resolving the certificate and exposed container of a push
//! - Deciding placement, listeners and tags
//! - Creating the load balancer, or reconciling it when the name is taken
//! - Configuring stickiness and the health check
//! - Registering the service URL in DNS for private placements
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐
//! │ CertResolver │  │ PortResolver │
//! └──────────────┘  └──────────────┘
//!         │                 │
//!         └────────┬────────┘
//!                  ▼
//!     ┌──────────────────────────┐        ┌────────────────┐
//!     │ LoadBalancerProvisioner  │───────▶│ policy::*      │
//!     └──────────────────────────┘        │ (pure)         │
//!                  │                      └────────────────┘
//!         ┌────────┴─────────┬──────────────────────┐
//!         ▼                  ▼                      ▼
//! ┌─────────────────┐ ┌──────────────┐     ┌─────────────────┐
//! │ LoadBalancerApi │ │ DnsRegistrar │     │ ProvisionEvent  │
//! │ (create/update) │ │ (private)    │     │ (notify)        │
//! └─────────────────┘ └──────────────┘     └─────────────────┘
//! ```
//!
//! ## Stages
//!
//! ```text
//! Resolving → Creating → Created ─────┐
//!                      └→ Reconciling ┴→ HealthCheckConfigured → Described
//!                                            → Registered | Skipped → Done
//! ```
//!
//! Every stage awaits the previous one. Nothing is retried except the
//! implicit create → reconcile transition, and nothing is rolled back.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::cluster::ClusterMetadata;
use crate::config::ProvisionConfig;
use crate::definition::{Protocol, PushDefinition};
use crate::error::{Error, Result};
use crate::policy::{build_listeners, build_tags, decide_placement, listener_ports};
use crate::traits::{
    CertDecision, CertResolver, CreateLoadBalancerRequest, CreateOutcome, DnsRegistrar,
    ExposedContainer, LoadBalancerApi, LoadBalancerDescription, PortResolver,
};

/// Name of the application-cookie stickiness policy
pub const STICKINESS_POLICY_NAME: &str = "StickyElbPolicy";

/// Listener port the stickiness policy is bound to
///
/// Fixed, independent of the service's source ports.
pub const STICKINESS_LISTENER_PORT: u16 = 443;

/// Stage of a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisionStage {
    /// Resolving certificate and exposed container
    Resolving,
    /// Submitting the create request
    Creating,
    /// A new load balancer was created
    Created,
    /// Updating an existing load balancer in place
    Reconciling,
    /// Health check submitted
    HealthCheckConfigured,
    /// Canonical description fetched
    Described,
    /// Service URL registered in DNS
    Registered,
    /// DNS registration skipped (public placement)
    Skipped,
    /// Run finished
    Done,
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Events emitted by the LoadBalancerProvisioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    /// A stage was entered
    Stage {
        load_balancer: String,
        stage: ProvisionStage,
    },

    /// A new load balancer was created
    LoadBalancerCreated {
        load_balancer: String,
    },

    /// An existing load balancer was updated
    LoadBalancerUpdated {
        load_balancer: String,
    },

    /// Stickiness policy bound to a listener
    StickinessApplied {
        load_balancer: String,
        cookie_name: String,
        port: u16,
    },

    /// Health check submitted
    HealthCheckConfigured {
        load_balancer: String,
        target: String,
    },

    /// Service URL registered in DNS
    DnsRegistered {
        url: String,
        endpoint: String,
    },

    /// DNS left to the CDN configuration; raw endpoint and expected URL
    CdnEndpoint {
        raw_endpoint: String,
        expected_url: String,
    },

    /// Run finished
    Completed {
        result: LoadBalancerResult,
    },
}

/// What the caller gets back from a provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerResult {
    /// Container the load balancer forwards to
    pub container_name: String,
    /// Port inside that container
    pub container_port: u16,
    /// Load balancer name
    pub load_balancer_name: String,
}

/// Everything resolved before the first mutating call
struct Resolved {
    protocol: Protocol,
    url_prefix: String,
    cert: CertDecision,
    exposed: ExposedContainer,
}

/// Load balancer provisioner
///
/// Drives one provisioning run per [`create_load_balancer`] call. Runs are
/// independent; the control plane's name uniqueness is the only guard
/// between concurrent runs for the same application.
///
/// [`create_load_balancer`]: LoadBalancerProvisioner::create_load_balancer
pub struct LoadBalancerProvisioner {
    /// Control plane receiving create/update calls
    api: Box<dyn LoadBalancerApi>,

    /// Certificate selection
    cert_resolver: Box<dyn CertResolver>,

    /// Exposed container discovery
    port_resolver: Box<dyn PortResolver>,

    /// DNS registration for private placements
    registrar: Box<dyn DnsRegistrar>,

    /// Tag key receiving the cluster's "Name" value
    cluster_tag_key: String,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ProvisionEvent>,
}

impl LoadBalancerProvisioner {
    /// Create a new provisioner
    ///
    /// # Returns
    ///
    /// A tuple of (provisioner, event_receiver) where event_receiver yields
    /// progress events
    pub fn new(
        api: Box<dyn LoadBalancerApi>,
        cert_resolver: Box<dyn CertResolver>,
        port_resolver: Box<dyn PortResolver>,
        registrar: Box<dyn DnsRegistrar>,
        config: &ProvisionConfig,
    ) -> Result<(Self, mpsc::Receiver<ProvisionEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.provisioner.event_channel_capacity);

        let provisioner = Self {
            api,
            cert_resolver,
            port_resolver,
            registrar,
            cluster_tag_key: config.cluster_tag_key.clone(),
            event_tx: tx,
        };

        Ok((provisioner, rx))
    }

    /// Create or update the load balancer for a push
    ///
    /// # Returns
    ///
    /// - `Ok(LoadBalancerResult)`: container and load balancer names
    /// - `Err(Error)`: the first unrecoverable failure; earlier mutating
    ///   calls stay in effect
    pub async fn create_load_balancer(
        &self,
        cluster: &ClusterMetadata,
        definition: &PushDefinition,
    ) -> Result<LoadBalancerResult> {
        let app_name = definition.app_name.as_str();
        let service = &definition.service;

        self.enter(app_name, ProvisionStage::Resolving);
        let resolved = self.resolve(definition).await?;

        let placement = decide_placement(service, &resolved.cert, cluster);
        debug!(
            "Placement for {}: scheme={} subnets={:?} security_groups={:?}",
            app_name, placement.scheme, placement.subnets, placement.security_groups
        );

        let request = CreateLoadBalancerRequest {
            name: app_name.to_string(),
            subnets: placement.subnets.clone(),
            listeners: build_listeners(
                &service.elb_source_ports,
                resolved.exposed.host_port,
                resolved.protocol,
                &resolved.cert.certificate_arn,
            ),
            scheme: placement.scheme,
            security_groups: placement.security_groups.clone(),
            tags: build_tags(&cluster.cluster_stack_tags, app_name, &self.cluster_tag_key),
        };

        self.enter(app_name, ProvisionStage::Creating);
        match self.api.create_load_balancer(&request).await {
            Ok(CreateOutcome::Created) => {
                self.enter(app_name, ProvisionStage::Created);
                info!("ELB created: {}", app_name);
                self.emit_event(ProvisionEvent::LoadBalancerCreated {
                    load_balancer: app_name.to_string(),
                });
            }
            Ok(CreateOutcome::AlreadyExists) => {
                debug!("Load balancer name {} is taken; updating in place", app_name);
                self.enter(app_name, ProvisionStage::Reconciling);
                info!("Updating ELB: {}", app_name);
                self.reconcile(&request, &service.elb_source_ports).await?;
                self.emit_event(ProvisionEvent::LoadBalancerUpdated {
                    load_balancer: app_name.to_string(),
                });
            }
            Err(e) => {
                return Err(Error::create_failed(request.to_string(), e.to_string()));
            }
        }

        if let Some(cookie_name) = &service.app_stickiness_cookie {
            self.apply_stickiness(app_name, cookie_name).await?;
        }

        let health_check = service.health_check.normalize(resolved.exposed.host_port);
        self.api
            .configure_health_check(app_name, &health_check)
            .await
            .map_err(|e| {
                e.in_operation(
                    "ConfigureHealthCheck",
                    format!("{{LoadBalancerName: {}, Target: {}}}", app_name, health_check.target),
                )
            })?;
        self.enter(app_name, ProvisionStage::HealthCheckConfigured);
        self.emit_event(ProvisionEvent::HealthCheckConfigured {
            load_balancer: app_name.to_string(),
            target: health_check.target.clone(),
        });

        let description = self.describe(app_name).await?;
        self.enter(app_name, ProvisionStage::Described);

        let registered_url = format!("{}.{}", resolved.url_prefix, service.url_suffix);
        let scheme = resolved.protocol.url_scheme();

        if placement.uses_internal_subnets {
            self.registrar
                .register_dns(
                    &registered_url,
                    &description.dns_name,
                    app_name,
                    &cluster.cluster_stack_tags,
                )
                .await
                .map_err(|e| match e {
                    Error::DnsRegistrar(_) => e,
                    other => Error::dns_registrar(format!(
                        "{} ({}) failed for {}: {}",
                        self.registrar.registrar_name(),
                        registered_url,
                        app_name,
                        other
                    )),
                })?;
            info!("... URL Registered: {}://{}", scheme, registered_url);
            self.enter(app_name, ProvisionStage::Registered);
            self.emit_event(ProvisionEvent::DnsRegistered {
                url: format!("{}://{}", scheme, registered_url),
                endpoint: description.dns_name.clone(),
            });
        } else {
            let raw_endpoint = format!("{}://{}", scheme, description.dns_name);
            let expected_url = format!("{}://{}", scheme, registered_url);
            info!("... Raw ELB DNS for Akamai: {}", raw_endpoint);
            info!("... Expected Akamai url: {}", expected_url);
            self.enter(app_name, ProvisionStage::Skipped);
            self.emit_event(ProvisionEvent::CdnEndpoint {
                raw_endpoint,
                expected_url,
            });
        }

        info!("... ELB updates complete");

        let result = LoadBalancerResult {
            container_name: resolved.exposed.container_name,
            container_port: resolved.exposed.container_port,
            load_balancer_name: app_name.to_string(),
        };
        self.enter(app_name, ProvisionStage::Done);
        self.emit_event(ProvisionEvent::Completed {
            result: result.clone(),
        });

        Ok(result)
    }

    /// Resolve protocol, URL prefix, certificate and exposed container
    ///
    /// Runs before any mutating call; every failure is a resolution failure.
    async fn resolve(&self, definition: &PushDefinition) -> Result<Resolved> {
        definition.validate()?;

        let service = &definition.service;
        let protocol = service.effective_protocol();
        let url_prefix = service.url_prefix(&definition.app_name).to_string();

        let derived = self
            .cert_resolver
            .derive_cert(protocol, &service.url_suffix, &url_prefix)
            .await
            .map_err(|e| into_resolution(self.cert_resolver.resolver_name(), e))?;

        let exposed = self
            .port_resolver
            .find_exposed_container(definition)
            .map_err(|e| into_resolution("port", e))?;

        let internet_facing = self
            .cert_resolver
            .is_internet_facing_url_scheme(&derived, service.url_scheme_override.as_deref());

        debug!(
            "Resolved {}: protocol={} container={} host_port={} internet_facing={}",
            definition.app_name, protocol, exposed.container_name, exposed.host_port, internet_facing
        );

        Ok(Resolved {
            protocol,
            url_prefix,
            cert: CertDecision {
                internet_facing,
                ..derived
            },
            exposed,
        })
    }

    /// Bring an existing load balancer in line with `request`
    ///
    /// Listeners on the replaced ports are deleted and recreated, security
    /// groups are replaced, tags are added and subnets attached. Each call
    /// stands alone; a failure leaves earlier calls applied.
    async fn reconcile(&self, request: &CreateLoadBalancerRequest, source_ports: &[u16]) -> Result<()> {
        let name = request.name.as_str();

        self.api
            .delete_listeners(name, &listener_ports(source_ports))
            .await
            .map_err(|e| e.in_operation("DeleteLoadBalancerListeners", request))?;

        self.api
            .create_listeners(name, &request.listeners)
            .await
            .map_err(|e| e.in_operation("CreateLoadBalancerListeners", request))?;

        self.api
            .apply_security_groups(name, &request.security_groups)
            .await
            .map_err(|e| e.in_operation("ApplySecurityGroupsToLoadBalancer", request))?;

        self.api
            .add_tags(name, &request.tags)
            .await
            .map_err(|e| e.in_operation("AddTags", request))?;

        self.api
            .attach_subnets(name, &request.subnets)
            .await
            .map_err(|e| e.in_operation("AttachLoadBalancerToSubnets", request))?;

        Ok(())
    }

    /// Create the cookie stickiness policy and bind it to port 443
    async fn apply_stickiness(&self, name: &str, cookie_name: &str) -> Result<()> {
        let params = format!(
            "{{LoadBalancerName: {}, PolicyName: {}, CookieName: {}, LoadBalancerPort: {}}}",
            name, STICKINESS_POLICY_NAME, cookie_name, STICKINESS_LISTENER_PORT
        );

        self.api
            .create_app_cookie_stickiness_policy(name, STICKINESS_POLICY_NAME, cookie_name)
            .await
            .map_err(|e| e.in_operation("CreateAppCookieStickinessPolicy", &params))?;

        self.api
            .set_listener_policies(
                name,
                STICKINESS_LISTENER_PORT,
                &[STICKINESS_POLICY_NAME.to_string()],
            )
            .await
            .map_err(|e| e.in_operation("SetLoadBalancerPoliciesOfListener", &params))?;

        debug!(
            "Stickiness cookie {} bound to {}:{}",
            cookie_name, name, STICKINESS_LISTENER_PORT
        );
        self.emit_event(ProvisionEvent::StickinessApplied {
            load_balancer: name.to_string(),
            cookie_name: cookie_name.to_string(),
            port: STICKINESS_LISTENER_PORT,
        });
        Ok(())
    }

    /// Fetch the canonical description; the first entry is authoritative
    async fn describe(&self, name: &str) -> Result<LoadBalancerDescription> {
        self.api
            .describe_load_balancers(name)
            .await
            .map_err(|e| e.in_operation("DescribeLoadBalancers", format!("{{LoadBalancerNames: [{}]}}", name)))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Load balancer {} not found after create/update ({})",
                    name,
                    self.api.api_name()
                ))
            })
    }

    fn enter(&self, load_balancer: &str, stage: ProvisionStage) {
        trace!("{}: {}", load_balancer, stage);
        self.emit_event(ProvisionEvent::Stage {
            load_balancer: load_balancer.to_string(),
            stage,
        });
    }

    /// Emit a provisioning event
    fn emit_event(&self, event: ProvisionEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

fn into_resolution(source: &str, err: Error) -> Error {
    match err {
        Error::Resolution(_) | Error::InvalidInput(_) => err,
        other => Error::resolution(format!("{} resolver: {}", source, other)),
    }
}
