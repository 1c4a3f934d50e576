// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tenant resolution and principal authentication.
//!
//! Resolution happens *before* authentication: when headers name a tenant,
//! token lookup is scoped to it, so a token from tenant A presented against
//! tenant B's subdomain is rejected rather than silently accepted.

use adcp_core::{Headers, SkillResult, TransportError};
use adcp_store::models::{Principal, Tenant};
use adcp_store::{Store, StoreError};
use tracing::{info, warn};

/// First host labels that never identify a tenant.
pub const RESERVED_SUBDOMAIN_LABELS: &[&str] = &["localhost", "www", "admin", "adcp-sales-agent"];

/// A tenant resolved from request headers, with how it was found.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    /// The tenant.
    pub tenant: Tenant,
    /// Which header identified it (for `/debug/tenant` and logs).
    pub detection_method: &'static str,
}

/// An authenticated `(tenant, principal)` pair.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The tenant the request executes under.
    pub tenant: Tenant,
    /// The authenticated principal.
    pub principal: Principal,
}

/// Map persistence failures into the transport taxonomy.
pub fn store_error(err: StoreError) -> TransportError {
    match err {
        StoreError::Unhealthy => TransportError::database_unhealthy(err.to_string()),
        other => TransportError::internal(other.to_string()),
    }
}

fn token_prefix(token: &str) -> &str {
    &token[..token.len().min(12)]
}

/// Resolve the tenant a request targets, by header precedence:
///
/// 1. `Host` subdomain (first label, unless reserved), falling back to a
///    virtual-host lookup of the full host;
/// 2. `x-adcp-tenant`, tried as a subdomain then as a tenant id;
/// 3. `Apx-Incoming-Host`, looked up as a virtual host.
///
/// `None` means no tenant was named; the caller may still proceed via
/// global token lookup.
pub async fn resolve_tenant(
    headers: &Headers,
    store: &dyn Store,
) -> SkillResult<Option<ResolvedTenant>> {
    // 1. Host header.
    if let Some(host) = headers.host() {
        let host = host.split(':').next().unwrap_or(host);
        if let Some(label) = host.split('.').next() {
            if host.contains('.') && !RESERVED_SUBDOMAIN_LABELS.contains(&label) {
                if let Some(tenant) = store
                    .tenant_by_subdomain(label)
                    .await
                    .map_err(store_error)?
                {
                    info!(subdomain = label, tenant_id = %tenant.tenant_id, "tenant resolved from Host subdomain");
                    return Ok(Some(ResolvedTenant {
                        tenant,
                        detection_method: "subdomain",
                    }));
                }
                if let Some(tenant) = store
                    .tenant_by_virtual_host(host)
                    .await
                    .map_err(store_error)?
                {
                    info!(host, tenant_id = %tenant.tenant_id, "tenant resolved from Host virtual host");
                    return Ok(Some(ResolvedTenant {
                        tenant,
                        detection_method: "host-virtual-host",
                    }));
                }
            }
        }
    }

    // 2. Explicit tenant header.
    if let Some(value) = headers.tenant_header() {
        if let Some(tenant) = store
            .tenant_by_subdomain(value)
            .await
            .map_err(store_error)?
        {
            info!(value, tenant_id = %tenant.tenant_id, "tenant resolved from x-adcp-tenant subdomain");
            return Ok(Some(ResolvedTenant {
                tenant,
                detection_method: "x-adcp-tenant",
            }));
        }
        if let Some(tenant) = store.tenant_by_id(value).await.map_err(store_error)? {
            info!(value, "tenant resolved from x-adcp-tenant id");
            return Ok(Some(ResolvedTenant {
                tenant,
                detection_method: "x-adcp-tenant-id",
            }));
        }
    }

    // 3. Edge rewrite header.
    if let Some(apx) = headers.apx_incoming_host() {
        if let Some(tenant) = store
            .tenant_by_virtual_host(apx)
            .await
            .map_err(store_error)?
        {
            info!(apx, tenant_id = %tenant.tenant_id, "tenant resolved from Apx-Incoming-Host");
            return Ok(Some(ResolvedTenant {
                tenant,
                detection_method: "apx-incoming-host",
            }));
        }
    }

    warn!("no tenant resolved from headers; global token lookup will apply");
    Ok(None)
}

/// Authenticate the request's bearer token.
///
/// When a tenant was resolved, the lookup is tenant-scoped and a
/// cross-tenant token fails with the resolved tenant named in the message.
/// Without a resolved tenant, a global lookup determines the tenant from
/// the principal.
pub async fn authenticate(
    headers: &Headers,
    resolved: Option<&ResolvedTenant>,
    store: &dyn Store,
) -> SkillResult<AuthContext> {
    let Some(token) = headers.bearer_token() else {
        return Err(TransportError::missing_authentication());
    };

    let scope = resolved.map(|r| r.tenant.tenant_id.as_str());
    let principal = store
        .principal_by_token(token, scope)
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            TransportError::invalid_auth_token(scope.unwrap_or("any"), token_prefix(token))
        })?;

    let tenant = match resolved {
        Some(resolved) => resolved.tenant.clone(),
        None => store
            .tenant_by_id(&principal.tenant_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| {
                TransportError::invalid_auth_token(&principal.tenant_id, token_prefix(token))
            })?,
    };

    info!(tenant_id = %tenant.tenant_id, principal_id = %principal.principal_id, "authenticated");
    Ok(AuthContext { tenant, principal })
}

/// Resolve tenant and, when credentials are present, authenticate.
///
/// Discovery skills call this: a missing token yields `(tenant, None)`; a
/// *present but invalid* token is still an error (no silent fallback).
pub async fn resolve_and_maybe_authenticate(
    headers: &Headers,
    store: &dyn Store,
) -> SkillResult<(Option<ResolvedTenant>, Option<AuthContext>)> {
    let resolved = resolve_tenant(headers, store).await?;
    if headers.bearer_token().is_none() {
        return Ok((resolved, None));
    }
    let auth = authenticate(headers, resolved.as_ref(), store).await?;
    Ok((resolved, Some(auth)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcp_core::ErrorKind;
    use adcp_store::mem::test_support;
    use adcp_store::MemStore;

    async fn store_with_two_tenants() -> MemStore {
        let store = MemStore::new();
        store.add_tenant(test_support::tenant("t_a", "alpha")).await;
        let mut beta = test_support::tenant("t_b", "beta");
        beta.virtual_host = Some("ads.beta-publisher.com".into());
        store.add_tenant(beta).await;
        store
            .add_principal(test_support::principal("t_a", "buyer_a", "tok_alpha"))
            .await;
        store
            .add_principal(test_support::principal("t_b", "buyer_b", "tok_beta"))
            .await;
        store
    }

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn host_subdomain_wins_first() {
        let store = store_with_two_tenants().await;
        let resolved = resolve_tenant(
            &headers(&[
                ("Host", "alpha.sales-agent.example.com"),
                ("x-adcp-tenant", "beta"),
            ]),
            &store,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(resolved.tenant.tenant_id, "t_a");
        assert_eq!(resolved.detection_method, "subdomain");
    }

    #[tokio::test]
    async fn reserved_labels_skip_subdomain_lookup() {
        let store = store_with_two_tenants().await;
        for host in ["localhost:8091", "www.example.com", "admin.example.com"] {
            let resolved = resolve_tenant(&headers(&[("Host", host)]), &store)
                .await
                .unwrap();
            assert!(resolved.is_none(), "{host} must not resolve a tenant");
        }
    }

    #[tokio::test]
    async fn tenant_header_tried_as_subdomain_then_id() {
        let store = store_with_two_tenants().await;
        let by_subdomain = resolve_tenant(&headers(&[("x-adcp-tenant", "beta")]), &store)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_subdomain.tenant.tenant_id, "t_b");

        let by_id = resolve_tenant(&headers(&[("x-adcp-tenant", "t_a")]), &store)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.tenant.tenant_id, "t_a");
        assert_eq!(by_id.detection_method, "x-adcp-tenant-id");
    }

    #[tokio::test]
    async fn apx_incoming_host_resolves_virtual_host() {
        let store = store_with_two_tenants().await;
        let resolved = resolve_tenant(
            &headers(&[
                ("Host", "localhost:8091"),
                ("Apx-Incoming-Host", "ads.beta-publisher.com"),
            ]),
            &store,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(resolved.tenant.tenant_id, "t_b");
        assert_eq!(resolved.detection_method, "apx-incoming-host");
    }

    #[tokio::test]
    async fn cross_tenant_token_rejected_with_tenant_named() {
        let store = store_with_two_tenants().await;
        let resolved = resolve_tenant(
            &headers(&[("Host", "beta.sales-agent.example.com")]),
            &store,
        )
        .await
        .unwrap();

        let err = authenticate(
            &headers(&[
                ("Host", "beta.sales-agent.example.com"),
                ("Authorization", "Bearer tok_alpha"),
            ]),
            resolved.as_ref(),
            &store,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAuthToken);
        assert!(err.message.contains("t_b"), "message must name the resolved tenant: {}", err.message);
        assert!(err.message.contains("tok_alpha"));
    }

    #[tokio::test]
    async fn same_token_against_own_subdomain_succeeds() {
        let store = store_with_two_tenants().await;
        let hdrs = headers(&[
            ("Host", "alpha.sales-agent.example.com"),
            ("Authorization", "Bearer tok_alpha"),
        ]);
        let resolved = resolve_tenant(&hdrs, &store).await.unwrap();
        let auth = authenticate(&hdrs, resolved.as_ref(), &store).await.unwrap();
        assert_eq!(auth.tenant.tenant_id, "t_a");
        assert_eq!(auth.principal.principal_id, "buyer_a");
    }

    #[tokio::test]
    async fn global_lookup_when_no_tenant_resolved() {
        let store = store_with_two_tenants().await;
        let hdrs = headers(&[
            ("Host", "localhost:8091"),
            ("Authorization", "Bearer tok_beta"),
        ]);
        let auth = authenticate(&hdrs, None, &store).await.unwrap();
        assert_eq!(auth.tenant.tenant_id, "t_b");
    }

    #[tokio::test]
    async fn missing_token_is_missing_authentication() {
        let store = store_with_two_tenants().await;
        let err = authenticate(&Headers::new(), None, &store).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingAuthentication);
    }

    #[tokio::test]
    async fn short_token_prefix_does_not_panic() {
        let store = store_with_two_tenants().await;
        let err = authenticate(
            &headers(&[("Authorization", "Bearer x")]),
            None,
            &store,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAuthToken);
    }

    #[tokio::test]
    async fn present_but_invalid_token_errors_even_for_discovery_path() {
        let store = store_with_two_tenants().await;
        let hdrs = headers(&[("Authorization", "Bearer bogus_token")]);
        let err = resolve_and_maybe_authenticate(&hdrs, &store).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAuthToken);
    }

    #[tokio::test]
    async fn absent_token_allows_anonymous_discovery() {
        let store = store_with_two_tenants().await;
        let hdrs = headers(&[("Host", "alpha.sales-agent.example.com")]);
        let (resolved, auth) = resolve_and_maybe_authenticate(&hdrs, &store).await.unwrap();
        assert!(resolved.is_some());
        assert!(auth.is_none());
    }
}
