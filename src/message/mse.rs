use rand::{self, Rng};

/// Length of the verification constant.
pub const VC_LENGTH: usize = 8;

/// Verification constant sent encrypted so the remote side can resynchronize.
pub const VC: [u8; VC_LENGTH] = [0u8; VC_LENGTH];

/// Plaintext bit of the crypto_provide/crypto_select bitfields.
pub const CRYPTO_PROVIDE_PLAINTEXT: u32 = 0x01;

/// RC4 bit of the crypto_provide/crypto_select bitfields.
pub const CRYPTO_PROVIDE_CRYPTO: u32 = 0x02;

/// Maximum length of any of the PadA/PadB/PadC/PadD paddings.
pub const PAD_MAXLEN: usize = 512;

/// Generate random padding of length 0 to 511 bytes.
pub fn generate_pad() -> Vec<u8> {
    let mut rng = rand::thread_rng();

    let len = rng.gen_range(0, PAD_MAXLEN);
    let mut pad = vec![0u8; len];
    rng.fill_bytes(&mut pad);

    pad
}
