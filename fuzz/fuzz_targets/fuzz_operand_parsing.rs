#![no_main]

use dl_zkpp::{GroupParameters, Operand};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(operand) = Operand::parse(text) {
        let value = operand.to_biguint().unwrap();
        assert_eq!(Operand::from_biguint(&value).to_biguint().unwrap(), value);

        let _ = GroupParameters::new(operand, Operand::from(2));
    }
});
