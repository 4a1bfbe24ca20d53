use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::error::{CodegenError, Result};
use crate::model::{Shape, ShapeId};
use crate::protocol::{ErrorTypeLocation, Framing, ProtocolGeneratorFactory, ServerProtocol, StaticProtocolFactory};

static DEFAULT_PROTOCOLS: Lazy<Vec<Arc<dyn ProtocolGeneratorFactory>>> = Lazy::new(|| {
    let header = || ErrorTypeLocation::Header("X-Amzn-Errortype".to_string());
    let body = |key: &str| ErrorTypeLocation::Body(key.to_string());
    let protocols = [
        ServerProtocol::new(
            ShapeId::from_parts("aws.protocols", "restJson1"),
            Framing::HttpBinding,
            "application/json",
            header(),
        ),
        ServerProtocol::new(
            ShapeId::from_parts("aws.protocols", "restXml"),
            Framing::HttpBinding,
            "application/xml",
            body("Code"),
        ),
        ServerProtocol::new(
            ShapeId::from_parts("aws.protocols", "awsJson1_0"),
            Framing::Rpc,
            "application/x-amz-json-1.0",
            body("__type"),
        ),
        ServerProtocol::new(
            ShapeId::from_parts("aws.protocols", "awsJson1_1"),
            Framing::Rpc,
            "application/x-amz-json-1.1",
            body("__type"),
        ),
        ServerProtocol::new(
            ShapeId::from_parts("smithy.protocols", "rpcv2Cbor"),
            Framing::Rpc,
            "application/cbor",
            body("__type"),
        ),
    ];
    protocols
        .into_iter()
        .map(|p| Arc::new(StaticProtocolFactory::new(p)) as Arc<dyn ProtocolGeneratorFactory>)
        .collect()
});

/// The built-in registry, default protocol first.
pub fn default_protocols() -> Vec<Arc<dyn ProtocolGeneratorFactory>> {
    DEFAULT_PROTOCOLS.clone()
}

/// Ordered registry of protocol factories keyed by protocol trait id.
#[derive(Clone)]
pub struct ServerProtocolLoader {
    factories: IndexMap<ShapeId, Arc<dyn ProtocolGeneratorFactory>>,
}

impl Default for ServerProtocolLoader {
    fn default() -> Self {
        Self::new(default_protocols())
    }
}

impl ServerProtocolLoader {
    pub fn new<I>(factories: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ProtocolGeneratorFactory>>,
    {
        let factories = factories
            .into_iter()
            .map(|f| (f.protocol_id().clone(), f))
            .collect();
        Self { factories }
    }

    /// Register another factory after the existing ones. A factory for an
    /// already known id replaces it in place.
    pub fn with_factory(mut self, factory: Arc<dyn ProtocolGeneratorFactory>) -> Self {
        self.factories.insert(factory.protocol_id().clone(), factory);
        self
    }

    pub fn supported(&self) -> Vec<ShapeId> {
        self.factories.keys().cloned().collect()
    }

    /// Registered protocols the service carries a trait for, in registry order.
    pub fn candidates(&self, service: &Shape) -> Vec<ShapeId> {
        self.factories
            .keys()
            .filter(|id| service.traits.has(&id.to_string()))
            .cloned()
            .collect()
    }

    /// Pick the one protocol `service` is served with.
    ///
    /// Zero or several candidates without an override are configuration
    /// errors; an override has to be among the candidates.
    pub fn protocol_for(
        &self,
        service: &Shape,
        protocol_override: Option<&ShapeId>,
    ) -> Result<(ShapeId, Arc<dyn ProtocolGeneratorFactory>)> {
        let candidates = self.candidates(service);
        let chosen = match (protocol_override, candidates.as_slice()) {
            (Some(wanted), _) => {
                if !candidates.contains(wanted) {
                    return Err(CodegenError::UnsupportedProtocolOverride {
                        service: service.id.clone(),
                        protocol: wanted.clone(),
                        candidates,
                    });
                }
                wanted.clone()
            }
            (None, []) => {
                return Err(CodegenError::ProtocolNotFound {
                    service: service.id.clone(),
                    supported: self.supported(),
                });
            }
            (None, [only]) => only.clone(),
            (None, _) => {
                return Err(CodegenError::AmbiguousProtocol {
                    service: service.id.clone(),
                    candidates,
                });
            }
        };
        let factory = self.factories[&chosen].clone();
        tracing::debug!(service = %service.id, protocol = %chosen, "resolved protocol");
        Ok((chosen, factory))
    }
}
