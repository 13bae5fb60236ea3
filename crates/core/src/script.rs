use thiserror::Error;

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;

pub const HASH160_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("hash160 must be 20 bytes, got {0}")]
    InvalidHashLength(usize),
}

/// Append a hash160 as a direct push (opcode 0x14 followed by the bytes).
fn push_hash160(script: &mut Vec<u8>, hash: &[u8]) -> Result<(), ScriptError> {
    if hash.len() != HASH160_LEN {
        return Err(ScriptError::InvalidHashLength(hash.len()));
    }
    script.push(HASH160_LEN as u8);
    script.extend_from_slice(hash);
    Ok(())
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn pay_to_pubkey_hash(hash: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_hash160(&mut script, hash)?;
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    Ok(script)
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn pay_to_script_hash(hash: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let mut script = Vec::with_capacity(23);
    script.push(OP_HASH160);
    push_hash160(&mut script, hash)?;
    script.push(OP_EQUAL);
    Ok(script)
}
