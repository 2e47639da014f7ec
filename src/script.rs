//! Script interpreter for P2PKH, P2SH and P2WPKH spends
//!
//! Scripts are tokenized into [`Opcode`]s and run on a byte-string stack.
//! One interpreter serves every output type; the spend type only decides the
//! script code and the sighash strategy handed to OP_CHECKSIG.
//!
//! Every failure (malformed script, stack underflow, bad signature,
//! unsupported sighash type) is a `false` result.

use crate::codec::hash160;
use crate::constants::{MAX_PUBKEYS_PER_MULTISIG, MAX_STACK_SIZE, SIGHASH_ALL};
use crate::error::{ConsensusError, Result};
use crate::sighash::{legacy_sighash, p2pkh_script_code, segwit_sighash};
use crate::types::*;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, VerifyOnly};
use tracing::trace;

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;
const OP_VERIFY: u8 = 0x69;
const OP_RETURN: u8 = 0x6a;
const OP_DROP: u8 = 0x75;
const OP_DUP: u8 = 0x76;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_HASH160: u8 = 0xa9;
const OP_CHECKSIG: u8 = 0xac;
const OP_CHECKSIGVERIFY: u8 = 0xad;
const OP_CHECKMULTISIG: u8 = 0xae;

/// Tokenized script element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// OP_0, OP_PUSHBYTES_n, OP_PUSHDATA1/2/4
    Push(ByteString),
    /// Small integer push. Parsing yields 1..=16; serializing also maps 0 to
    /// OP_0 and writes larger values as a one-byte data push.
    PushNum(u8),
    Dup,
    Drop,
    Verify,
    Return,
    Hash160,
    Equal,
    EqualVerify,
    CheckSig,
    CheckSigVerify,
    CheckMultisig,
    /// Any opcode this interpreter does not execute
    Other(u8),
}

/// Tokenize raw script bytes
pub fn parse_script(script: &[u8]) -> Result<Vec<Opcode>> {
    let mut ops = Vec::new();
    let mut pc = 0;

    while pc < script.len() {
        let opcode = script[pc];
        pc += 1;

        let push_len = match opcode {
            0x01..=0x4b => Some(opcode as usize),
            OP_PUSHDATA1 => Some(read_len(script, &mut pc, 1)?),
            OP_PUSHDATA2 => Some(read_len(script, &mut pc, 2)?),
            OP_PUSHDATA4 => Some(read_len(script, &mut pc, 4)?),
            _ => None,
        };

        let op = match (push_len, opcode) {
            (Some(len), _) => {
                let data = script.get(pc..pc + len).ok_or_else(|| {
                    ConsensusError::Serialization(format!("push of {} bytes past end of script", len))
                })?;
                pc += len;
                Opcode::Push(data.to_vec())
            }
            (None, OP_0) => Opcode::Push(Vec::new()),
            (None, OP_1..=OP_16) => Opcode::PushNum(opcode - OP_1 + 1),
            (None, OP_DUP) => Opcode::Dup,
            (None, OP_DROP) => Opcode::Drop,
            (None, OP_VERIFY) => Opcode::Verify,
            (None, OP_RETURN) => Opcode::Return,
            (None, OP_HASH160) => Opcode::Hash160,
            (None, OP_EQUAL) => Opcode::Equal,
            (None, OP_EQUALVERIFY) => Opcode::EqualVerify,
            (None, OP_CHECKSIG) => Opcode::CheckSig,
            (None, OP_CHECKSIGVERIFY) => Opcode::CheckSigVerify,
            (None, OP_CHECKMULTISIG) => Opcode::CheckMultisig,
            (None, other) => Opcode::Other(other),
        };
        ops.push(op);
    }

    Ok(ops)
}

fn read_len(script: &[u8], pc: &mut usize, width: usize) -> Result<usize> {
    let bytes = script
        .get(*pc..*pc + width)
        .ok_or_else(|| ConsensusError::Serialization("truncated push length".to_string()))?;
    *pc += width;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(bytes);
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Serialize tokens back to script bytes, using minimal push encodings
pub fn serialize_script(ops: &[Opcode]) -> ByteString {
    let mut script = Vec::new();
    for op in ops {
        match op {
            Opcode::Push(data) => {
                let len = data.len();
                match len {
                    0 => script.push(OP_0),
                    1..=0x4b => script.push(len as u8),
                    0x4c..=0xff => script.extend_from_slice(&[OP_PUSHDATA1, len as u8]),
                    0x100..=0xffff => {
                        script.push(OP_PUSHDATA2);
                        script.extend_from_slice(&(len as u16).to_le_bytes());
                    }
                    _ => {
                        script.push(OP_PUSHDATA4);
                        script.extend_from_slice(&(len as u32).to_le_bytes());
                    }
                }
                script.extend_from_slice(data);
            }
            Opcode::PushNum(0) => script.push(OP_0),
            Opcode::PushNum(n @ 1..=16) => script.push(OP_1 + n - 1),
            Opcode::PushNum(n) => script.extend_from_slice(&[0x01, *n]),
            Opcode::Dup => script.push(OP_DUP),
            Opcode::Drop => script.push(OP_DROP),
            Opcode::Verify => script.push(OP_VERIFY),
            Opcode::Return => script.push(OP_RETURN),
            Opcode::Hash160 => script.push(OP_HASH160),
            Opcode::Equal => script.push(OP_EQUAL),
            Opcode::EqualVerify => script.push(OP_EQUALVERIFY),
            Opcode::CheckSig => script.push(OP_CHECKSIG),
            Opcode::CheckSigVerify => script.push(OP_CHECKSIGVERIFY),
            Opcode::CheckMultisig => script.push(OP_CHECKMULTISIG),
            Opcode::Other(b) => script.push(*b),
        }
    }
    script
}

/// Output type of a locking script
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptType {
    P2PKH,
    P2SH,
    P2WPKH,
    P2WSH,
    P2TR,
    Unknown,
}

/// Classify a locking script by its template
pub fn classify_script(script: &[u8]) -> ScriptType {
    match script {
        [0x76, 0xa9, 0x14, hash @ .., 0x88, 0xac] if hash.len() == 20 => ScriptType::P2PKH,
        [0xa9, 0x14, hash @ .., 0x87] if hash.len() == 20 => ScriptType::P2SH,
        [0x00, 0x14, program @ ..] if program.len() == 20 => ScriptType::P2WPKH,
        [0x00, 0x20, program @ ..] if program.len() == 32 => ScriptType::P2WSH,
        [0x51, 0x20, program @ ..] if program.len() == 32 => ScriptType::P2TR,
        _ => ScriptType::Unknown,
    }
}

/// Injected signature check: DER signature, 32-byte digest, SEC1 public key
pub trait SignatureVerifier {
    fn verify(&self, signature_der: &[u8], message_hash: &Hash, public_key: &[u8]) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8], &Hash, &[u8]) -> bool,
{
    fn verify(&self, signature_der: &[u8], message_hash: &Hash, public_key: &[u8]) -> bool {
        self(signature_der, message_hash, public_key)
    }
}

/// ECDSA verification over secp256k1
pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, signature_der: &[u8], message_hash: &Hash, public_key: &[u8]) -> bool {
        let pubkey = match PublicKey::from_slice(public_key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let mut signature = match Signature::from_der(signature_der) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        // libsecp256k1 only accepts low-S
        signature.normalize_s();

        let message = match Message::from_digest_slice(message_hash) {
            Ok(m) => m,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// How OP_CHECKSIG builds the message it verifies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashStrategy {
    Legacy,
    Segwit,
}

/// What OP_CHECKSIG signs over for one input
#[derive(Debug, Clone)]
pub struct SigContext<'a> {
    pub tx: &'a Transaction,
    pub input_index: usize,
    pub script_code: ByteString,
    /// Value of the spent output (committed to by segwit sighashes)
    pub amount: u64,
    pub strategy: SighashStrategy,
}

impl SigContext<'_> {
    fn sighash(&self, sighash_type: u8) -> Option<Hash> {
        match self.strategy {
            SighashStrategy::Legacy => {
                if self.input_index >= self.tx.inputs.len() {
                    return None;
                }
                Some(legacy_sighash(self.tx, self.input_index, &self.script_code, sighash_type as u32))
            }
            SighashStrategy::Segwit => segwit_sighash(
                self.tx,
                self.input_index,
                &self.script_code,
                self.amount,
                sighash_type as u32,
            ),
        }
    }
}

/// Stack machine shared by every output-type validator
pub struct ScriptInterpreter<'v, V: SignatureVerifier + ?Sized> {
    verifier: &'v V,
}

impl<'v, V: SignatureVerifier + ?Sized> ScriptInterpreter<'v, V> {
    pub fn new(verifier: &'v V) -> Self {
        Self { verifier }
    }

    /// Run `script` against `stack`
    ///
    /// Returns false as soon as an opcode fails. Signature opcodes fail when
    /// no signing context is given.
    pub fn execute(&self, script: &[Opcode], stack: &mut Vec<ByteString>, ctx: Option<&SigContext>) -> bool {
        for op in script {
            if !self.step(op, stack, ctx) {
                trace!(?op, depth = stack.len(), "script failed");
                return false;
            }
            if stack.len() > MAX_STACK_SIZE {
                return false;
            }
        }
        true
    }

    fn step(&self, op: &Opcode, stack: &mut Vec<ByteString>, ctx: Option<&SigContext>) -> bool {
        match op {
            Opcode::Push(data) => {
                stack.push(data.clone());
                true
            }
            Opcode::PushNum(n) => {
                stack.push(num_item(*n));
                true
            }
            Opcode::Dup => match stack.last().cloned() {
                Some(top) => {
                    stack.push(top);
                    true
                }
                None => false,
            },
            Opcode::Drop => stack.pop().is_some(),
            Opcode::Verify => matches!(stack.pop(), Some(top) if cast_to_bool(&top)),
            Opcode::Return => false,
            Opcode::Hash160 => match stack.pop() {
                Some(top) => {
                    stack.push(hash160(&top).to_vec());
                    true
                }
                None => false,
            },
            Opcode::Equal | Opcode::EqualVerify => {
                let (Some(a), Some(b)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                if *op == Opcode::EqualVerify {
                    a == b
                } else {
                    stack.push(bool_item(a == b));
                    true
                }
            }
            Opcode::CheckSig | Opcode::CheckSigVerify => {
                let (Some(pubkey), Some(signature)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                let Some(ctx) = ctx else {
                    return false;
                };
                let valid = self.check_signature(&signature, &pubkey, ctx);
                if *op == Opcode::CheckSigVerify {
                    valid
                } else {
                    stack.push(bool_item(valid));
                    true
                }
            }
            Opcode::CheckMultisig => match ctx {
                Some(ctx) => self.check_multisig(stack, ctx),
                None => false,
            },
            Opcode::Other(_) => false,
        }
    }

    /// Verify `signature ‖ sighash_type` against `pubkey`; only SIGHASH_ALL is accepted
    pub fn check_signature(&self, signature: &[u8], pubkey: &[u8], ctx: &SigContext) -> bool {
        let Some((&sighash_type, der)) = signature.split_last() else {
            return false;
        };
        if sighash_type != SIGHASH_ALL {
            trace!(sighash_type, "unsupported sighash type");
            return false;
        }
        match ctx.sighash(sighash_type) {
            Some(digest) => self.verifier.verify(der, &digest, pubkey),
            None => false,
        }
    }

    /// OP_CHECKMULTISIG: <dummy> <sig…> <m> <pubkey…> <n>
    ///
    /// Signatures must match public keys in order. The dummy element below
    /// the signatures is popped as well.
    fn check_multisig(&self, stack: &mut Vec<ByteString>, ctx: &SigContext) -> bool {
        let Some(n) = stack.pop().and_then(|item| small_int(&item)) else {
            return false;
        };
        if n > MAX_PUBKEYS_PER_MULTISIG || stack.len() < n {
            return false;
        }
        let pubkeys = stack.split_off(stack.len() - n);

        let Some(m) = stack.pop().and_then(|item| small_int(&item)) else {
            return false;
        };
        if m > n || stack.len() < m {
            return false;
        }
        let signatures = stack.split_off(stack.len() - m);

        if stack.pop().is_none() {
            return false;
        }

        let mut keys = pubkeys.iter();
        let success = signatures
            .iter()
            .all(|signature| keys.any(|pubkey| self.check_signature(signature, pubkey, ctx)));

        stack.push(bool_item(success));
        true
    }
}

/// Non-zero and not negative zero
fn cast_to_bool(item: &[u8]) -> bool {
    match item.split_last() {
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last != 0 && last != 0x80),
        None => false,
    }
}

fn bool_item(value: bool) -> ByteString {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Decode a stack item holding 0…20
/// Minimal stack encoding of a small number; zero is the empty item
fn num_item(n: u8) -> ByteString {
    if n == 0 {
        Vec::new()
    } else {
        vec![n]
    }
}

fn small_int(item: &[u8]) -> Option<usize> {
    match item {
        [] => Some(0),
        [n] if (*n as usize) <= MAX_PUBKEYS_PER_MULTISIG => Some(*n as usize),
        _ => None,
    }
}

/// Exactly one element left, and it is true
fn clean_stack_true(stack: &[ByteString]) -> bool {
    stack.len() == 1 && cast_to_bool(&stack[0])
}

/// Stack produced by a push-only script-sig, None if it executes anything else
fn push_only_stack(script_sig: &[u8]) -> Option<Vec<ByteString>> {
    parse_script(script_sig)
        .ok()?
        .into_iter()
        .map(|op| match op {
            Opcode::Push(data) => Some(data),
            Opcode::PushNum(n) => Some(num_item(n)),
            _ => None,
        })
        .collect()
}

/// Input and its resolved prevout
fn spent_output(tx: &Transaction, input_index: usize) -> Option<(&TransactionInput, &Prevout)> {
    let input = tx.inputs.get(input_index)?;
    Some((input, input.prevout.as_ref()?))
}

/// P2PKH: `<sig> <pubkey>` against `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn validate_p2pkh<V: SignatureVerifier + ?Sized>(tx: &Transaction, input_index: usize, verifier: &V) -> bool {
    let Some((input, prevout)) = spent_output(tx, input_index) else {
        return false;
    };
    let Some(mut stack) = push_only_stack(&input.script_sig) else {
        return false;
    };
    let Ok(script_pubkey) = parse_script(&prevout.scriptpubkey) else {
        return false;
    };

    let ctx = SigContext {
        tx,
        input_index,
        script_code: prevout.scriptpubkey.clone(),
        amount: prevout.value,
        strategy: SighashStrategy::Legacy,
    };
    let interpreter = ScriptInterpreter::new(verifier);
    interpreter.execute(&script_pubkey, &mut stack, Some(&ctx)) && clean_stack_true(&stack)
}

/// Verifier used where no signature may be checked
struct NoSignatures;

impl SignatureVerifier for NoSignatures {
    fn verify(&self, _: &[u8], _: &Hash, _: &[u8]) -> bool {
        false
    }
}

/// P2SH hash check: the redeem script rebuilt from its tokens must hash to
/// the value committed by `OP_HASH160 <hash> OP_EQUAL`
///
/// The redeem script itself is not executed.
pub fn validate_p2sh_basic(redeem_script: &[Opcode], script_pubkey: &[Opcode]) -> bool {
    let mut stack = vec![serialize_script(redeem_script)];
    let interpreter = ScriptInterpreter::new(&NoSignatures);
    interpreter.execute(script_pubkey, &mut stack, None) && clean_stack_true(&stack)
}

/// Full P2SH spend: hash check, then the redeem script run against the
/// remaining script-sig pushes. A P2WPKH redeem script is validated as a
/// nested segwit spend.
pub fn validate_p2sh<V: SignatureVerifier + ?Sized>(tx: &Transaction, input_index: usize, verifier: &V) -> bool {
    let Some((input, prevout)) = spent_output(tx, input_index) else {
        return false;
    };
    let Some(mut stack) = push_only_stack(&input.script_sig) else {
        return false;
    };
    let Some(redeem_bytes) = stack.pop() else {
        return false;
    };
    let (Ok(redeem_script), Ok(script_pubkey)) = (parse_script(&redeem_bytes), parse_script(&prevout.scriptpubkey))
    else {
        return false;
    };

    if !validate_p2sh_basic(&redeem_script, &script_pubkey) {
        return false;
    }

    if classify_script(&redeem_bytes) == ScriptType::P2WPKH {
        return stack.is_empty() && validate_witness_pubkey_hash(tx, input_index, &redeem_bytes[2..], verifier);
    }

    let ctx = SigContext {
        tx,
        input_index,
        script_code: redeem_bytes,
        amount: prevout.value,
        strategy: SighashStrategy::Legacy,
    };
    let interpreter = ScriptInterpreter::new(verifier);
    interpreter.execute(&redeem_script, &mut stack, Some(&ctx)) && clean_stack_true(&stack)
}

/// P2WPKH: witness `[sig, pubkey]` against the program `0014<hash>`
pub fn validate_p2wpkh<V: SignatureVerifier + ?Sized>(tx: &Transaction, input_index: usize, verifier: &V) -> bool {
    let Some((input, prevout)) = spent_output(tx, input_index) else {
        return false;
    };
    if !input.script_sig.is_empty() || classify_script(&prevout.scriptpubkey) != ScriptType::P2WPKH {
        return false;
    }
    validate_witness_pubkey_hash(tx, input_index, &prevout.scriptpubkey[2..], verifier)
}

/// Witness signature check, then the equivalent P2PKH script over the witness items
fn validate_witness_pubkey_hash<V: SignatureVerifier + ?Sized>(
    tx: &Transaction,
    input_index: usize,
    pubkey_hash: &[u8],
    verifier: &V,
) -> bool {
    let Some((input, prevout)) = spent_output(tx, input_index) else {
        return false;
    };
    let Some([signature, pubkey]) = input.witness.as_deref() else {
        return false;
    };

    let script_code = p2pkh_script_code(pubkey_hash);
    let Ok(p2pkh_script) = parse_script(&script_code) else {
        return false;
    };
    let ctx = SigContext {
        tx,
        input_index,
        script_code,
        amount: prevout.value,
        strategy: SighashStrategy::Segwit,
    };

    let interpreter = ScriptInterpreter::new(verifier);
    if !interpreter.check_signature(signature, pubkey, &ctx) {
        return false;
    }

    let mut stack = vec![signature.clone(), pubkey.clone()];
    interpreter.execute(&p2pkh_script, &mut stack, Some(&ctx)) && clean_stack_true(&stack)
}

/// Validate one input by the type of the output it spends
pub fn validate_input<V: SignatureVerifier + ?Sized>(tx: &Transaction, input_index: usize, verifier: &V) -> bool {
    let Some((_, prevout)) = spent_output(tx, input_index) else {
        return false;
    };
    match classify_script(&prevout.scriptpubkey) {
        ScriptType::P2PKH => validate_p2pkh(tx, input_index, verifier),
        ScriptType::P2SH => validate_p2sh(tx, input_index, verifier),
        ScriptType::P2WPKH => validate_p2wpkh(tx, input_index, verifier),
        other => {
            trace!(?other, input_index, "unsupported output type");
            false
        }
    }
}

/// Every input authorizes its spend
pub fn validate_transaction_scripts<V: SignatureVerifier + ?Sized>(tx: &Transaction, verifier: &V) -> bool {
    !tx.inputs.is_empty() && (0..tx.inputs.len()).all(|i| validate_input(tx, i, verifier))
}
