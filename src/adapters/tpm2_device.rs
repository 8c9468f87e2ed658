//! TPM 2.0 adapter on an ESAPI context
//!
//! ESAPI tracks sessions and objects as `ESYS_TR` values; [`Handle`] wraps
//! those. Policy sessions are remembered so later assertions can be issued
//! on them. The context sits behind a `RefCell` so the port traits can take
//! `&self`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::str::FromStr;

use rand::RngCore;
use tracing::{debug, error, info};
use tss_esapi::attributes::SessionAttributesBuilder;
use tss_esapi::constants::property_tag::PropertyTag;
use tss_esapi::constants::SessionType;
use tss_esapi::handles::{KeyHandle, ObjectHandle, SessionHandle};
use tss_esapi::interface_types::algorithm::HashingAlgorithm;
use tss_esapi::interface_types::resource_handles::Hierarchy;
use tss_esapi::interface_types::session_handles::{AuthSession, PolicySession};
use tss_esapi::structures::{Auth, Digest, Nonce, Private, Public, SymmetricDefinition};
use tss_esapi::traits::UnMarshall;
use tss_esapi::{Context, TctiNameConf};

use crate::error::{TransportError, UnsealError, UnsealResult};
use crate::model::{Handle, PcrBank, PcrSelection, RootKeyTemplate, SealedBlob, UnsealedSecret};
use crate::ports::{
    ContextFlusher, DeviceFinder, KeyLoader, PolicySessions, TransportConfig, Unsealer,
};
use crate::readiness::ReadinessGate;

/// `TPM_PT_FAMILY_INDICATOR` value of a TPM 2.0, "2.0\0"
pub const TPM2_FAMILY: u32 = 0x322e_3000;

const NONCE_SIZE: usize = 16;

/// What the module reported about itself during identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmIdentity {
    pub family: u32,
    pub manufacturer: String,
}

impl TpmIdentity {
    /// Build from the raw fixed properties; the manufacturer is four ASCII bytes
    pub fn from_properties(family: u32, manufacturer: u32) -> Self {
        let manufacturer = manufacturer
            .to_be_bytes()
            .iter()
            .filter(|b| b.is_ascii_graphic())
            .map(|&b| b as char)
            .collect();
        Self {
            family,
            manufacturer,
        }
    }

    pub fn is_tpm2(&self) -> bool {
        self.family == TPM2_FAMILY
    }
}

/// A module reached through the TSS2 ESAPI
pub struct Tpm2Device {
    context: RefCell<Context>,
    sessions: RefCell<HashMap<u32, PolicySession>>,
}

impl Tpm2Device {
    /// Wrap an open context and check that the module is a TPM 2.0
    ///
    /// # Errors
    ///
    /// Returns `UnsealError::NotAModule` if the fixed properties cannot be
    /// read or report another family.
    pub fn connect(context: Context) -> UnsealResult<Self> {
        let device = Self {
            context: RefCell::new(context),
            sessions: RefCell::new(HashMap::new()),
        };
        let identity = device.identify().map_err(|e| {
            debug!("Capability query failed: {}", e);
            UnsealError::NotAModule
        })?;
        if !identity.is_tpm2() {
            debug!("Unexpected TPM family indicator {:#010x}", identity.family);
            return Err(UnsealError::NotAModule);
        }
        info!("Found TPM 2.0 from manufacturer {}", identity.manufacturer);
        Ok(device)
    }

    /// Open the module named by `config`
    pub fn open(config: &TransportConfig) -> UnsealResult<Self> {
        let target = config.tcti_name();
        let tcti = TctiNameConf::from_str(&target).map_err(|tpm_err| {
            error!(?tpm_err);
            TransportError::OpenFailed {
                target: target.clone(),
                reason: tpm_err.to_string(),
            }
        })?;
        let context = Context::new(tcti).map_err(|tpm_err| {
            error!(?tpm_err);
            TransportError::OpenFailed {
                target: target.clone(),
                reason: tpm_err.to_string(),
            }
        })?;
        debug!("Opened {}", target);
        Self::connect(context)
    }

    /// Query the family indicator and manufacturer properties
    pub fn identify(&self) -> UnsealResult<TpmIdentity> {
        let mut context = self.context.borrow_mut();
        let family = context
            .get_tpm_property(PropertyTag::FamilyIndicator)
            .map_err(TransportError::command("GetCapability"))?
            .unwrap_or_default();
        let manufacturer = context
            .get_tpm_property(PropertyTag::Manufacturer)
            .map_err(TransportError::command("GetCapability"))?
            .unwrap_or_default();
        Ok(TpmIdentity::from_properties(family, manufacturer))
    }

    fn policy_session(&self, session: Handle) -> UnsealResult<PolicySession> {
        self.sessions
            .borrow()
            .get(&session.value())
            .copied()
            .ok_or_else(|| TransportError::NotASession(session).into())
    }
}

fn handle_of(object: ObjectHandle) -> Handle {
    Handle::new(object.into())
}

fn object_of(handle: Handle) -> ObjectHandle {
    ObjectHandle::from(handle.value())
}

impl PolicySessions for Tpm2Device {
    fn start_policy_session(&self) -> UnsealResult<Handle> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);
        let nonce =
            Nonce::try_from(nonce.to_vec()).map_err(TransportError::command("StartAuthSession"))?;

        let mut context = self.context.borrow_mut();
        let auth_session = context
            .start_auth_session(
                None,
                None,
                Some(nonce),
                SessionType::Policy,
                SymmetricDefinition::Null,
                HashingAlgorithm::Sha256,
            )
            .map_err(TransportError::command("StartAuthSession"))?
            .ok_or_else(|| TransportError::CommandFailed {
                command: "StartAuthSession",
                source: tss_esapi::Error::WrapperError(
                    tss_esapi::WrapperErrorKind::WrongValueFromTpm,
                ),
            })?;

        let handle = handle_of(SessionHandle::from(auth_session).into());
        let (attributes, mask) = SessionAttributesBuilder::new()
            .with_continue_session(true)
            .build();
        let policy_session = context
            .tr_sess_set_attributes(auth_session, attributes, mask)
            .and_then(|()| PolicySession::try_from(auth_session));
        let policy_session = match policy_session {
            Ok(policy_session) => policy_session,
            Err(tpm_err) => {
                // not yet tracked, so no guard will release it
                let _ = context.flush_context(object_of(handle));
                return Err(TransportError::command("StartAuthSession")(tpm_err).into());
            }
        };
        self.sessions.borrow_mut().insert(handle.value(), policy_session);
        debug!("Started policy session {}", handle);
        Ok(handle)
    }

    fn policy_pcr(
        &self,
        session: Handle,
        selection: &PcrSelection,
        bank: PcrBank,
    ) -> UnsealResult<()> {
        let policy_session = self.policy_session(session)?;
        let selection_list = selection
            .to_selection_list(bank)
            .map_err(TransportError::command("PolicyPCR"))?;
        // empty pcrDigest: the module uses the current values
        self.context
            .borrow_mut()
            .policy_pcr(policy_session, Digest::default(), selection_list)
            .map_err(TransportError::command("PolicyPCR"))?;
        Ok(())
    }

    fn policy_password(&self, session: Handle) -> UnsealResult<()> {
        let policy_session = self.policy_session(session)?;
        self.context
            .borrow_mut()
            .policy_password(policy_session)
            .map_err(TransportError::command("PolicyPassword"))?;
        Ok(())
    }

    fn policy_get_digest(&self, session: Handle) -> UnsealResult<Vec<u8>> {
        let policy_session = self.policy_session(session)?;
        let digest = self
            .context
            .borrow_mut()
            .policy_get_digest(policy_session)
            .map_err(TransportError::command("PolicyGetDigest"))?;
        Ok(digest.value().to_vec())
    }
}

impl KeyLoader for Tpm2Device {
    fn create_primary(&self, template: &RootKeyTemplate) -> UnsealResult<Handle> {
        let public = template
            .to_public()
            .map_err(TransportError::command("CreatePrimary"))?;
        let result = self
            .context
            .borrow_mut()
            .execute_with_nullauth_session(|ctx| {
                ctx.create_primary(Hierarchy::Owner, public, None, None, None, None)
            })
            .map_err(TransportError::command("CreatePrimary"))?;
        let handle = handle_of(result.key_handle.into());
        debug!("Created {} primary key {}", template.algorithm, handle);
        Ok(handle)
    }

    fn load(&self, parent: Handle, blob: &SealedBlob) -> UnsealResult<Handle> {
        let private =
            Private::try_from(blob.private.clone()).map_err(TransportError::command("Load"))?;
        let public = Public::unmarshall(&blob.public).map_err(TransportError::command("Load"))?;
        let key_handle = self
            .context
            .borrow_mut()
            .execute_with_nullauth_session(|ctx| {
                ctx.load(KeyHandle::from(object_of(parent)), private, public)
            })
            .map_err(TransportError::command("Load"))?;
        let handle = handle_of(key_handle.into());
        debug!("Loaded sealed object {} under {}", handle, parent);
        Ok(handle)
    }
}

impl Unsealer for Tpm2Device {
    fn unseal(&self, session: Handle, object: Handle, auth: &[u8]) -> UnsealResult<UnsealedSecret> {
        let policy_session = self.policy_session(session)?;
        let auth = Auth::try_from(auth.to_vec()).map_err(TransportError::command("Unseal"))?;

        let mut context = self.context.borrow_mut();
        context
            .tr_set_auth(object_of(object), auth)
            .map_err(TransportError::command("Unseal"))?;
        let data = context
            .execute_with_session(Some(AuthSession::PolicySession(policy_session)), |ctx| {
                ctx.unseal(object_of(object))
            })
            .map_err(TransportError::command("Unseal"))?;
        Ok(UnsealedSecret::new(data.value().to_vec()))
    }
}

impl ContextFlusher for Tpm2Device {
    fn flush_context(&self, handle: Handle) -> UnsealResult<()> {
        self.context
            .borrow_mut()
            .flush_context(object_of(handle))
            .map_err(TransportError::command("FlushContext"))?;
        self.sessions.borrow_mut().remove(&handle.value());
        debug!("Flushed {}", handle);
        Ok(())
    }
}

/// Opens the configured device node or emulator
#[derive(Debug, Clone)]
pub struct Tpm2DeviceFinder {
    config: TransportConfig,
    gate: ReadinessGate,
}

impl Tpm2DeviceFinder {
    pub fn new(config: TransportConfig, gate: ReadinessGate) -> Self {
        Self { config, gate }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl DeviceFinder for Tpm2DeviceFinder {
    type Device = Tpm2Device;

    fn find_first(&self) -> UnsealResult<Self::Device> {
        // the emulator is not discovered through udev
        if !self.config.emulated {
            self.gate.await_ready(self.config.ready_timeout);
        }
        Tpm2Device::open(&self.config)
    }
}
