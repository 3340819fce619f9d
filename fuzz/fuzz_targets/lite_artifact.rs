#![no_main]

use aligerar::lite::LiteModel;
use aligerar::runtime::Interpreter;
use libfuzzer_sys::fuzz_target;

/// Fuzz target for artifact decoding
///
/// Arbitrary bytes must either be rejected or yield a model whose
/// interpreter runs without panicking.
fuzz_target!(|data: &[u8]| {
    let Ok(model) = LiteModel::from_bytes(data) else {
        return;
    };
    let Ok(interpreter) = Interpreter::new(&model) else {
        return;
    };
    if interpreter.input_len() <= 4096 {
        let _ = interpreter.predict(&vec![0.5; interpreter.input_len()]);
    }
});
