//! In-memory module for exercising the pipeline without a TPM
//!
//! Policy digests follow the TPM 2.0 hash chain, so digests computed here
//! match what a real module reports for the same PCR values. Sealed objects
//! use a private format that only this fake understands.

use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{TransportError, UnsealError, UnsealResult};
use crate::logic::derive_auth;
use crate::model::{
    Algorithm, AuthSecret, Handle, PcrBank, PcrSelection, PolicySpec, RootKeyTemplate, SealedBlob,
    UnsealedSecret,
};
use crate::ports::{
    ContextFlusher, DeviceFinder, KeyLoader, PolicySessions, TransportConfig, Unsealer,
};

const TPM_CC_POLICY_PCR: u32 = 0x0000_017f;
const TPM_CC_POLICY_AUTH_VALUE: u32 = 0x0000_016b;

const MAX_SESSIONS: usize = 3;
const MAX_OBJECTS: usize = 3;
const SESSION_FIRST: u32 = 0x0300_0000;
const TRANSIENT_FIRST: u32 = 0x8000_0000;

/// Commands the fake has been asked to run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartAuthSession,
    PolicyPcr,
    PolicyPassword,
    PolicyGetDigest,
    CreatePrimary,
    Load,
    Unseal,
    FlushContext,
}

impl Command {
    fn name(self) -> &'static str {
        match self {
            Command::StartAuthSession => "StartAuthSession",
            Command::PolicyPcr => "PolicyPCR",
            Command::PolicyPassword => "PolicyPassword",
            Command::PolicyGetDigest => "PolicyGetDigest",
            Command::CreatePrimary => "CreatePrimary",
            Command::Load => "Load",
            Command::Unseal => "Unseal",
            Command::FlushContext => "FlushContext",
        }
    }

    fn refused(self) -> UnsealError {
        TransportError::command(self.name())(tss_esapi::Error::WrapperError(
            tss_esapi::WrapperErrorKind::InvalidParam,
        ))
        .into()
    }
}

#[derive(Debug)]
struct Session {
    digest: Vec<u8>,
    password_required: bool,
}

#[derive(Debug)]
enum Object {
    Primary {
        seed: [u8; 32],
    },
    Sealed {
        auth_policy: Vec<u8>,
        auth_value: Vec<u8>,
        data: Vec<u8>,
    },
}

#[derive(Debug, Default)]
struct State {
    pcrs: HashMap<(PcrBank, u8), Vec<u8>>,
    sessions: HashMap<u32, Session>,
    objects: HashMap<u32, Object>,
    next_handle: u32,
    fail_next: Option<Command>,
    commands: Vec<Command>,
}

/// Shared handle to one fake module; clones see the same state
#[derive(Debug, Clone)]
pub struct FakeTpm {
    owner_seed: [u8; 32],
    state: Rc<RefCell<State>>,
}

impl Default for FakeTpm {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTpm {
    pub fn new() -> Self {
        Self {
            owner_seed: Sha256::digest(b"fake owner seed").into(),
            state: Rc::default(),
        }
    }

    /// Make the next `command` fail as if the module refused it
    pub fn fail_next(&self, command: Command) {
        self.state.borrow_mut().fail_next = Some(command);
    }

    /// Sessions and objects not yet flushed
    pub fn outstanding_handles(&self) -> usize {
        let state = self.state.borrow();
        state.sessions.len() + state.objects.len()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    pub fn pcr(&self, bank: PcrBank, index: u8) -> Vec<u8> {
        self.state
            .borrow()
            .pcrs
            .get(&(bank, index))
            .cloned()
            .unwrap_or_else(|| vec![0u8; bank.digest_size()])
    }

    /// Extend `data` into one PCR
    ///
    /// Both banks hash with SHA-256; the sha1 bank keeps the first 20 bytes.
    pub fn extend_pcr(&self, bank: PcrBank, index: u8, data: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.pcr(bank, index));
        hasher.update(data);
        let mut value = hasher.finalize().to_vec();
        value.truncate(bank.digest_size());
        self.state.borrow_mut().pcrs.insert((bank, index), value);
    }

    /// Digest a policy session reaches against the current PCR values
    pub fn trial_policy_digest(
        &self,
        selection: &PcrSelection,
        bank: PcrBank,
        requires_password: bool,
    ) -> Vec<u8> {
        let mut digest = vec![0u8; 32];
        if !selection.is_empty() {
            let values = self.selected_values(selection, bank);
            digest = extend_policy_pcr(&digest, selection, bank, &values);
        }
        if requires_password {
            digest = extend_policy_password(&digest);
        }
        digest
    }

    /// Seal `data` so it loads under the `algorithm` root key
    pub fn seal(
        &self,
        algorithm: Algorithm,
        auth_policy: &[u8],
        auth_value: &[u8],
        data: &[u8],
    ) -> SealedBlob {
        let mut body = vec![auth_value.len() as u8];
        body.extend_from_slice(auth_value);
        body.extend_from_slice(data);

        let public = auth_policy.to_vec();
        let mut private = integrity(&self.primary_seed(algorithm), &public, &body);
        private.extend_from_slice(&body);
        SealedBlob::new(public, private)
    }

    /// Seal `data` behind a policy built from the current PCR values
    pub fn seal_for_policy(
        &self,
        algorithm: Algorithm,
        selection: PcrSelection,
        bank: PcrBank,
        secret: Option<&AuthSecret>,
        data: &[u8],
    ) -> (SealedBlob, PolicySpec) {
        let digest = self.trial_policy_digest(&selection, bank, secret.is_some());
        let auth_value = secret
            .map(|s| derive_auth(s).encoded().to_vec())
            .unwrap_or_default();
        let blob = self.seal(algorithm, &digest, &auth_value, data);
        let policy = PolicySpec::new(selection, bank, digest, secret.is_some());
        (blob, policy)
    }

    fn primary_seed(&self, algorithm: Algorithm) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.owner_seed);
        hasher.update(algorithm.name());
        hasher.finalize().into()
    }

    fn selected_values(&self, selection: &PcrSelection, bank: PcrBank) -> Vec<u8> {
        selection
            .indices()
            .flat_map(|index| self.pcr(bank, index))
            .collect()
    }

    /// Log `command` and consume a pending injected failure
    fn run(&self, command: Command) -> UnsealResult<()> {
        let mut state = self.state.borrow_mut();
        state.commands.push(command);
        if state.fail_next == Some(command) {
            state.fail_next = None;
            return Err(command.refused());
        }
        Ok(())
    }

    fn allocate(state: &mut State, first: u32) -> Handle {
        state.next_handle += 1;
        Handle::new(first + state.next_handle)
    }

    fn with_session<R>(
        &self,
        command: Command,
        session: Handle,
        f: impl FnOnce(&mut Session) -> R,
    ) -> UnsealResult<R> {
        self.run(command)?;
        let mut state = self.state.borrow_mut();
        let session = state
            .sessions
            .get_mut(&session.value())
            .ok_or(TransportError::NotASession(session))?;
        Ok(f(session))
    }
}

fn extend_policy_pcr(
    old: &[u8],
    selection: &PcrSelection,
    bank: PcrBank,
    values: &[u8],
) -> Vec<u8> {
    // single-entry TPML_PCR_SELECTION
    let alg_id: u16 = match bank {
        PcrBank::Sha1 => 0x0004,
        PcrBank::Sha256 => 0x000b,
    };
    let mut hasher = Sha256::new();
    hasher.update(old);
    hasher.update(TPM_CC_POLICY_PCR.to_be_bytes());
    hasher.update(1u32.to_be_bytes());
    hasher.update(alg_id.to_be_bytes());
    hasher.update([PcrSelection::SELECT_SIZE as u8]);
    hasher.update(selection.bitmap());
    hasher.update(Sha256::digest(values));
    hasher.finalize().to_vec()
}

fn extend_policy_password(old: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(old);
    hasher.update(TPM_CC_POLICY_AUTH_VALUE.to_be_bytes());
    hasher.finalize().to_vec()
}

fn integrity(seed: &[u8; 32], public: &[u8], body: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(public);
    hasher.update(body);
    hasher.finalize().to_vec()
}

impl PolicySessions for FakeTpm {
    fn start_policy_session(&self) -> UnsealResult<Handle> {
        self.run(Command::StartAuthSession)?;
        let mut state = self.state.borrow_mut();
        if state.sessions.len() >= MAX_SESSIONS {
            return Err(Command::StartAuthSession.refused());
        }
        let handle = Self::allocate(&mut state, SESSION_FIRST);
        state.sessions.insert(
            handle.value(),
            Session {
                digest: vec![0u8; 32],
                password_required: false,
            },
        );
        Ok(handle)
    }

    fn policy_pcr(
        &self,
        session: Handle,
        selection: &PcrSelection,
        bank: PcrBank,
    ) -> UnsealResult<()> {
        let values = self.selected_values(selection, bank);
        self.with_session(Command::PolicyPcr, session, |s| {
            s.digest = extend_policy_pcr(&s.digest, selection, bank, &values);
        })
    }

    fn policy_password(&self, session: Handle) -> UnsealResult<()> {
        self.with_session(Command::PolicyPassword, session, |s| {
            s.digest = extend_policy_password(&s.digest);
            s.password_required = true;
        })
    }

    fn policy_get_digest(&self, session: Handle) -> UnsealResult<Vec<u8>> {
        self.with_session(Command::PolicyGetDigest, session, |s| s.digest.clone())
    }
}

impl KeyLoader for FakeTpm {
    fn create_primary(&self, template: &RootKeyTemplate) -> UnsealResult<Handle> {
        self.run(Command::CreatePrimary)?;
        let seed = self.primary_seed(template.algorithm);
        let mut state = self.state.borrow_mut();
        if state.objects.len() >= MAX_OBJECTS {
            return Err(Command::CreatePrimary.refused());
        }
        let handle = Self::allocate(&mut state, TRANSIENT_FIRST);
        state.objects.insert(handle.value(), Object::Primary { seed });
        Ok(handle)
    }

    fn load(&self, parent: Handle, blob: &SealedBlob) -> UnsealResult<Handle> {
        self.run(Command::Load)?;
        let mut state = self.state.borrow_mut();
        let seed = match state.objects.get(&parent.value()) {
            Some(Object::Primary { seed }) => *seed,
            _ => return Err(Command::Load.refused()),
        };
        if state.objects.len() >= MAX_OBJECTS || blob.private.len() < 33 {
            return Err(Command::Load.refused());
        }
        let (tag, body) = blob.private.split_at(32);
        if tag != integrity(&seed, &blob.public, body).as_slice() {
            return Err(Command::Load.refused());
        }
        let auth_len = usize::from(body[0]);
        if body.len() < 1 + auth_len {
            return Err(Command::Load.refused());
        }
        let handle = Self::allocate(&mut state, TRANSIENT_FIRST);
        state.objects.insert(
            handle.value(),
            Object::Sealed {
                auth_policy: blob.public.clone(),
                auth_value: body[1..1 + auth_len].to_vec(),
                data: body[1 + auth_len..].to_vec(),
            },
        );
        Ok(handle)
    }
}

impl Unsealer for FakeTpm {
    fn unseal(&self, session: Handle, object: Handle, auth: &[u8]) -> UnsealResult<UnsealedSecret> {
        self.run(Command::Unseal)?;
        let state = self.state.borrow();
        let session = state
            .sessions
            .get(&session.value())
            .ok_or(TransportError::NotASession(session))?;
        match state.objects.get(&object.value()) {
            Some(Object::Sealed {
                auth_policy,
                auth_value,
                data,
            }) if *auth_policy == session.digest
                && (!session.password_required || auth_value.as_slice() == auth) =>
            {
                Ok(UnsealedSecret::new(data.clone()))
            }
            _ => Err(Command::Unseal.refused()),
        }
    }
}

impl ContextFlusher for FakeTpm {
    fn flush_context(&self, handle: Handle) -> UnsealResult<()> {
        self.run(Command::FlushContext)?;
        let mut state = self.state.borrow_mut();
        let removed = state.sessions.remove(&handle.value()).is_some()
            || state.objects.remove(&handle.value()).is_some();
        if removed {
            Ok(())
        } else {
            Err(Command::FlushContext.refused())
        }
    }
}

/// Hands out a clone of `device`, or fails as a missing device node would
pub struct FakeDeviceFinder {
    pub device: Option<FakeTpm>,
}

impl DeviceFinder for FakeDeviceFinder {
    type Device = FakeTpm;

    fn find_first(&self) -> UnsealResult<Self::Device> {
        self.device.clone().ok_or_else(|| {
            TransportError::OpenFailed {
                target: TransportConfig::default().tcti_name(),
                reason: "no such device".to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::tpm_contract;

    contract_tests_for!(
        fake_tpm_contract,
        make = FakeTpm::new,
        tests = {
            test_fresh_session_has_empty_digest => tpm_contract::test_fresh_session_has_empty_digest,
            test_policy_password_digest => tpm_contract::test_policy_password_digest,
            test_policy_pcr_order_matters => tpm_contract::test_policy_pcr_order_matters,
            test_create_primary_for_each_algorithm => tpm_contract::test_create_primary_for_each_algorithm,
            test_load_garbage_fails => tpm_contract::test_load_garbage_fails,
            test_flush_unknown_handle_fails => tpm_contract::test_flush_unknown_handle_fails,
        }
    );

    #[test]
    fn test_policy_pcr_matches_trial_digest() {
        let tpm = FakeTpm::new();
        tpm.extend_pcr(PcrBank::Sha256, 7, b"secure-boot");
        let selection = PcrSelection::new([7]).unwrap();

        let session = tpm.start_policy_session().unwrap();
        tpm.policy_pcr(session, &selection, PcrBank::Sha256).unwrap();
        assert_eq!(
            tpm.policy_get_digest(session).unwrap(),
            tpm.trial_policy_digest(&selection, PcrBank::Sha256, false)
        );
        assert_eq!(
            tpm.commands(),
            vec![
                Command::StartAuthSession,
                Command::PolicyPcr,
                Command::PolicyGetDigest
            ]
        );
    }

    #[test]
    fn test_session_limit() {
        let tpm = FakeTpm::new();
        for _ in 0..MAX_SESSIONS {
            tpm.start_policy_session().unwrap();
        }
        assert!(tpm.start_policy_session().is_err());
        assert_eq!(tpm.outstanding_handles(), MAX_SESSIONS);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let tpm = FakeTpm::new();
        tpm.fail_next(Command::CreatePrimary);
        let template = RootKeyTemplate::for_algorithm(Algorithm::Rsa);
        assert!(matches!(
            tpm.create_primary(&template).unwrap_err(),
            UnsealError::Transport(TransportError::CommandFailed {
                command: "CreatePrimary",
                ..
            })
        ));
        assert!(tpm.create_primary(&template).is_ok());
    }

    #[test]
    fn test_create_load_unseal_and_flush() {
        let tpm = FakeTpm::new();
        let digest = tpm.trial_policy_digest(&PcrSelection::empty(), PcrBank::Sha256, false);
        let blob = tpm.seal(Algorithm::Rsa, &digest, &[], b"payload");

        let parent = tpm
            .create_primary(&RootKeyTemplate::for_algorithm(Algorithm::Rsa))
            .unwrap();
        let object = tpm.load(parent, &blob).unwrap();
        let session = tpm.start_policy_session().unwrap();
        let secret = tpm.unseal(session, object, &[]).unwrap();
        assert_eq!(secret.as_bytes(), b"payload");

        for handle in [session, object, parent] {
            tpm.flush_context(handle).unwrap();
        }
        assert_eq!(tpm.outstanding_handles(), 0);
    }

    #[test]
    fn test_unseal_on_flushed_session_is_refused() {
        let tpm = FakeTpm::new();
        let session = tpm.start_policy_session().unwrap();
        tpm.flush_context(session).unwrap();
        assert!(matches!(
            tpm.policy_password(session).unwrap_err(),
            UnsealError::Transport(TransportError::NotASession(_))
        ));
    }

    #[test]
    fn test_finder_without_device() {
        let finder = FakeDeviceFinder { device: None };
        assert!(matches!(
            finder.find_first().unwrap_err(),
            UnsealError::Transport(TransportError::OpenFailed { .. })
        ));
    }
}
