//! Pins the opcode table. Opcode values are the object file's wire format, so
//! renumbering, renaming or changing an operand shape must be deliberate: update
//! `EXPECTED_ISA_HASH` with the value printed by `print_isa_hash`.

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;
const EXPECTED_ISA_HASH: u64 = 6483249453369968846;

fn fnv1a64(mut h: u64, bytes: &[u8]) -> u64 {
    for b in bytes {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

macro_rules! hash_isa {
    (
        $( $(#[$doc:meta])* $name:ident = $opcode:literal, $mnemonic:literal => [ $( $field:ident : $kind:ident ),* $(,)? ] ),* $(,)?
    ) => {{
        let mut h = FNV_OFFSET;
        $(
            h = fnv1a64(h, stringify!($name).as_bytes());
            h = fnv1a64(h, &[crate::virtual_machine::isa::Instruction::$name as u8]);
            h = fnv1a64(h, $mnemonic.as_bytes());
            $( h = fnv1a64(h, stringify!($kind).as_bytes()); )*
        )*
        h
    }};
}

fn current_isa_hash() -> u64 {
    crate::for_each_instruction!(hash_isa)
}

#[test]
#[ignore]
fn print_isa_hash() {
    println!("ISA_HASH={}", current_isa_hash());
}

#[test]
fn isa_hash_unchanged() {
    assert_eq!(current_isa_hash(), EXPECTED_ISA_HASH);
}
