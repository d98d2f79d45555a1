//! Field-by-field precedence: explicit value, then registry, then default.

use std::fmt::Debug;
use std::future::Future;

use tracing::debug;

use crate::config::Defaults;
use crate::error::Error;
use crate::models::{ConnectionParams, Overrides, WakeupParams};
use crate::registry::{Registry, SecretStore};

/// Resolves one field. The registry lookup only runs when there is no
/// explicit value and a host name was given; the default only applies when
/// both came up empty.
pub async fn resolve_field<T, F, Fut>(
    field: &str,
    explicit: Option<T>,
    host: Option<&str>,
    lookup: F,
    default: Option<T>,
) -> Result<Option<T>, Error>
where
    T: Debug,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Option<T>, Error>>,
{
    if let Some(value) = explicit {
        debug!("{} = {:?} (explicit)", field, value);
        return Ok(Some(value));
    }

    if let Some(host) = host {
        if let Some(value) = lookup(host.to_string()).await? {
            debug!("{} = {:?} (registry)", field, value);
            return Ok(Some(value));
        }
    }

    if default.is_some() {
        debug!("{} = {:?} (default)", field, default);
    } else {
        debug!("{} unresolved", field);
    }
    Ok(default)
}

pub struct Resolver<'a, S> {
    registry: &'a Registry<S>,
    overrides: &'a Overrides,
    defaults: &'a Defaults,
}

impl<'a, S: SecretStore> Resolver<'a, S> {
    pub fn new(registry: &'a Registry<S>, overrides: &'a Overrides, defaults: &'a Defaults) -> Self {
        Self {
            registry,
            overrides,
            defaults,
        }
    }

    fn host(&self) -> Option<&str> {
        self.overrides.host.as_deref()
    }

    /// Fails with `UnknownHost` when a host name was given but is not
    /// registered, whatever else was passed explicitly.
    pub async fn check_host(&self) -> Result<(), Error> {
        if let Some(host) = self.host() {
            if !self.registry.host_known(host).await {
                return Err(Error::UnknownHost(host.to_string()));
            }
        }
        Ok(())
    }

    /// Address first, then port. A missing port means "let ssh decide".
    pub async fn connection(&self) -> Result<ConnectionParams, Error> {
        let lan = self.overrides.lan;

        let address = resolve_field(
            "address",
            self.overrides.address.clone(),
            self.host(),
            move |host| async move { Ok(self.registry.address(&host, lan).await) },
            None,
        )
        .await?
        .ok_or(Error::UnresolvedAddress)?;

        let port = resolve_field(
            "port",
            self.overrides.port,
            self.host(),
            move |host| async move { self.registry.ssh_port(&host, lan).await },
            None,
        )
        .await?;

        Ok(ConnectionParams {
            address,
            port,
            user: self.overrides.user.clone(),
        })
    }

    /// Only called once a wakeup is actually going to be sent.
    pub async fn wakeup(&self) -> Result<WakeupParams, Error> {
        let lan = self.overrides.lan;

        let mac = resolve_field(
            "wakeup mac",
            self.overrides.wakeup_mac.clone(),
            self.host(),
            move |host| async move { Ok(self.registry.mac(&host).await) },
            None,
        )
        .await?
        .ok_or(Error::UnresolvedMac)?;

        let port = resolve_field(
            "wakeup port",
            self.overrides.wakeup_port,
            self.host(),
            move |host| async move { self.registry.wakeup_port(&host, lan).await },
            Some(self.defaults.wakeup_port),
        )
        .await?
        .unwrap_or(self.defaults.wakeup_port);

        let delay = resolve_field(
            "wakeup delay",
            self.overrides.wakeup_delay,
            self.host(),
            move |host| async move { self.registry.wakeup_delay(&host).await },
            Some(self.defaults.wakeup_delay),
        )
        .await?
        .unwrap_or(self.defaults.wakeup_delay);

        Ok(WakeupParams { mac, port, delay })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryStore;

    fn registry() -> Registry<MemoryStore> {
        let store = MemoryStore::new()
            .with("computers/nas/net/global/ip-address", "nas.example.com")
            .with("computers/nas/net/local/ip-address", "192.168.1.20")
            .with("computers/nas/net/global/port-ssh", "2222")
            .with("computers/nas/net/global/port-wakeup", "9")
            .with("computers/nas/net/mac-address", "AA:BB:CC:DD:EE:FF")
            .with("computers/bare/net/global/ip-address", "bare.example.com");
        Registry::new(store, "computers")
    }

    fn overrides(host: Option<&str>) -> Overrides {
        Overrides {
            host: host.map(str::to_string),
            ..Overrides::default()
        }
    }

    #[tokio::test]
    async fn combinator_precedence() {
        let lookup = |_: String| async { Ok(Some(2)) };
        let none = |_: String| async { Ok(None) };

        assert_eq!(
            resolve_field("f", Some(1), Some("h"), lookup, Some(3)).await.unwrap(),
            Some(1)
        );
        assert_eq!(
            resolve_field("f", None, Some("h"), lookup, Some(3)).await.unwrap(),
            Some(2)
        );
        assert_eq!(
            resolve_field("f", None, None, lookup, Some(3)).await.unwrap(),
            Some(3)
        );
        assert_eq!(
            resolve_field("f", None, Some("h"), none, Some(3)).await.unwrap(),
            Some(3)
        );
        assert_eq!(
            resolve_field::<i32, _, _>("f", None, Some("h"), none, None).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn explicit_value_skips_lookup() {
        let lookup = |_: String| async { panic!("registry must not be consulted") };
        let value: Option<u16> = resolve_field("f", Some(7), Some("h"), lookup, None)
            .await
            .unwrap();
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn explicit_port_beats_registry() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = Overrides {
            port: Some(22),
            ..overrides(Some("nas"))
        };
        let params = Resolver::new(&registry, &overrides, &defaults)
            .connection()
            .await
            .unwrap();
        assert_eq!(params.address, "nas.example.com");
        assert_eq!(params.port, Some(22));
    }

    #[tokio::test]
    async fn registry_port_used_when_not_explicit() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = overrides(Some("nas"));
        let params = Resolver::new(&registry, &overrides, &defaults)
            .connection()
            .await
            .unwrap();
        assert_eq!(params.port, Some(2222));
    }

    #[tokio::test]
    async fn port_may_stay_unresolved() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = overrides(Some("bare"));
        let params = Resolver::new(&registry, &overrides, &defaults)
            .connection()
            .await
            .unwrap();
        assert_eq!(params.address, "bare.example.com");
        assert_eq!(params.port, None);
    }

    #[tokio::test]
    async fn lan_scope_selects_local_address() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = Overrides {
            lan: true,
            ..overrides(Some("nas"))
        };
        let params = Resolver::new(&registry, &overrides, &defaults)
            .connection()
            .await
            .unwrap();
        assert_eq!(params.address, "192.168.1.20");
        assert_eq!(params.port, None);
    }

    #[tokio::test]
    async fn unknown_host_fails_even_with_explicit_address() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = Overrides {
            address: Some("10.0.0.5".into()),
            ..overrides(Some("ghost"))
        };
        let err = Resolver::new(&registry, &overrides, &defaults)
            .check_host()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownHost(ref h) if h == "ghost"));
    }

    #[tokio::test]
    async fn no_address_is_fatal() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = overrides(None);
        let err = Resolver::new(&registry, &overrides, &defaults)
            .connection()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedAddress));
    }

    #[tokio::test]
    async fn wakeup_fields_fall_back_to_defaults() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = Overrides {
            lan: true,
            ..overrides(Some("nas"))
        };
        let wakeup = Resolver::new(&registry, &overrides, &defaults)
            .wakeup()
            .await
            .unwrap();
        assert_eq!(
            wakeup,
            WakeupParams {
                mac: "AA:BB:CC:DD:EE:FF".into(),
                port: 40000,
                delay: 60,
            }
        );
    }

    #[tokio::test]
    async fn wakeup_uses_registry_port() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = Overrides {
            wakeup_delay: Some(5),
            ..overrides(Some("nas"))
        };
        let wakeup = Resolver::new(&registry, &overrides, &defaults)
            .wakeup()
            .await
            .unwrap();
        assert_eq!(wakeup.port, 9);
        assert_eq!(wakeup.delay, 5);
    }

    #[tokio::test]
    async fn missing_mac_is_fatal() {
        let registry = registry();
        let defaults = Defaults::default();
        let overrides = overrides(Some("bare"));
        let err = Resolver::new(&registry, &overrides, &defaults)
            .wakeup()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedMac));
    }
}
