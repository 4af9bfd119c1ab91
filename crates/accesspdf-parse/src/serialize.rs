//! Writes an operator sequence back to content stream bytes.
//!
//! The output re-tokenizes to the same operators, so unmodified content
//! survives a tokenize/serialize cycle semantically unchanged.

use crate::tokenizer::{Operand, Operator, is_delimiter, is_whitespace};

/// Serialize operators, one per line.
pub fn serialize(ops: &[Operator]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        write_operator(&mut out, op);
        out.push(b'\n');
    }
    out
}

fn write_operator(out: &mut Vec<u8>, op: &Operator) {
    if op.name == "BI" {
        write_inline_image(out, op);
        return;
    }
    for operand in &op.operands {
        write_operand(out, operand);
        out.push(b' ');
    }
    out.extend_from_slice(op.name.as_bytes());
}

fn write_inline_image(out: &mut Vec<u8>, op: &Operator) {
    out.extend_from_slice(b"BI");
    if let Some(Operand::Dictionary(entries)) = op.operands.first() {
        for (key, value) in entries {
            out.push(b' ');
            write_name(out, key);
            out.push(b' ');
            write_operand(out, value);
        }
    }
    out.extend_from_slice(b" ID ");
    if let Some(data) = op.operands.get(1).and_then(Operand::as_string_bytes) {
        out.extend_from_slice(data);
    }
    out.extend_from_slice(b"\nEI");
}

pub(crate) fn write_operand(out: &mut Vec<u8>, operand: &Operand) {
    match operand {
        Operand::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Operand::Real(r) => out.extend_from_slice(format_real(*r).as_bytes()),
        Operand::Name(n) => write_name(out, n),
        Operand::LiteralString(bytes) => write_literal_string(out, bytes),
        Operand::HexString(bytes) => {
            out.push(b'<');
            for b in bytes {
                out.extend_from_slice(format!("{b:02X}").as_bytes());
            }
            out.push(b'>');
        }
        Operand::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_operand(out, item);
            }
            out.push(b']');
        }
        Operand::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Operand::Null => out.extend_from_slice(b"null"),
        Operand::Dictionary(entries) => {
            out.extend_from_slice(b"<<");
            for (key, value) in entries {
                write_name(out, key);
                out.push(b' ');
                write_operand(out, value);
                out.push(b' ');
            }
            out.extend_from_slice(b">>");
        }
    }
}

/// Fixed-point real with trailing zeros trimmed, always keeping a decimal
/// point so it re-reads as a real.
fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0.0".to_string();
    }
    let mut s = format!("{value:.10}");
    while s.ends_with('0') && !s.ends_with(".0") {
        s.pop();
    }
    if s == "-0.0" { "0.0".to_string() } else { s }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        if b == b'#' || !(0x21..=0x7E).contains(&b) || is_delimiter(b) || is_whitespace(b) {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn reserialize(input: &[u8]) -> (Vec<Operator>, Vec<Operator>) {
        let ops = tokenize(input).unwrap();
        let again = tokenize(&serialize(&ops)).unwrap();
        (ops, again)
    }

    #[test]
    fn text_block_survives_reserialization() {
        let (ops, again) =
            reserialize(b"BT /F1 12 Tf 72 720 Td (Hello \\(world\\)) Tj [(A) -120.5 (B)] TJ ET");
        assert_eq!(ops, again);
    }

    #[test]
    fn marked_content_survives_reserialization() {
        let (ops, again) = reserialize(
            b"/P <</MCID 0>> BDC BT (x) Tj ET EMC /Artifact BMC 0 0 m 10 10 l S EMC",
        );
        assert_eq!(ops, again);
    }

    #[test]
    fn inline_image_survives_reserialization() {
        let (ops, again) = reserialize(b"q BI /W 1 /H 1 /BPC 8 /CS /G ID \x7F EI Q");
        assert_eq!(ops, again);
    }

    #[test]
    fn real_formatting_is_trimmed() {
        assert_eq!(format_real(3.0), "3.0");
        assert_eq!(format_real(0.5), "0.5");
        assert_eq!(format_real(-12.25), "-12.25");
        assert_eq!(format_real(-0.0), "0.0");
    }

    #[test]
    fn names_with_delimiters_are_escaped() {
        let mut out = Vec::new();
        write_name(&mut out, "A B(C)");
        assert_eq!(out, b"/A#20B#28C#29");
        let ops = tokenize(&[out.as_slice(), b" BMC"].concat()).unwrap();
        assert_eq!(ops[0].marked_content_tag(), Some("A B(C)"));
    }

    #[test]
    fn line_breaks_in_strings_are_escaped() {
        let ops = vec![Operator::new(
            "Tj",
            vec![Operand::LiteralString(b"a\r\nb".to_vec())],
        )];
        let bytes = serialize(&ops);
        assert_eq!(bytes, b"(a\\r\\nb) Tj\n");
        assert_eq!(tokenize(&bytes).unwrap(), ops);
    }

    #[test]
    fn hex_string_written_uppercase() {
        let ops = vec![Operator::new("Tj", vec![Operand::HexString(vec![0xAB, 0x01])])];
        assert_eq!(serialize(&ops), b"<AB01> Tj\n");
    }
}
