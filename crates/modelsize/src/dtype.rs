//! Tensor dtype labels.

/// Storage size in bytes of one scalar of the given safetensors dtype.
///
/// Matching is case-insensitive and substring-based, so quantized labels such
/// as `F8_E4M3` classify as one byte. The first matching rule wins:
///
/// | label contains  | bytes |
/// |-----------------|-------|
/// | `F16`, `BF16`   | 2     |
/// | `F64`           | 8     |
/// | `F8`            | 1     |
/// | `I8`, `U8`      | 1     |
/// | `I32`, `U32`    | 4     |
/// | `I64`, `U64`    | 8     |
///
/// Anything else is counted as a 4-byte float.
#[must_use]
pub fn bytes_per_param(dtype: &str) -> u64 {
    let dtype = dtype.to_ascii_uppercase();
    let has = |needle: &str| dtype.contains(needle);

    if has("F16") || has("BF16") {
        2
    } else if has("F64") {
        8
    } else if has("F8") {
        1
    } else if has("I8") || has("U8") {
        1
    } else if has("I32") || has("U32") {
        4
    } else if has("I64") || has("U64") {
        8
    } else {
        4
    }
}

/// Map a PyTorch dtype name (as found in `config.json` `torch_dtype`) to the
/// safetensors label. Unknown names are upper-cased.
#[must_use]
pub fn torch_dtype_to_safetensors(dtype: &str) -> String {
    let label = match dtype {
        "float16" | "half" => "F16",
        "float32" | "float" => "F32",
        "float64" | "double" => "F64",
        "bfloat16" => "BF16",
        "int8" => "I8",
        "int16" | "short" => "I16",
        "int32" | "int" => "I32",
        "int64" | "long" => "I64",
        "uint8" | "byte" => "U8",
        "uint16" => "U16",
        "uint32" => "U32",
        "uint64" => "U64",
        "bool" => "BOOL",
        "complex64" => "C64",
        "complex128" => "C128",
        other => return other.to_uppercase(),
    };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_precision_is_two_bytes_in_any_case() {
        for dtype in ["f16", "F16", "bf16", "BF16", "Bf16"] {
            assert_eq!(bytes_per_param(dtype), 2, "{dtype}");
        }
    }

    #[test]
    fn integer_and_wide_types() {
        assert_eq!(bytes_per_param("I64"), 8);
        assert_eq!(bytes_per_param("U64"), 8);
        assert_eq!(bytes_per_param("U8"), 1);
        assert_eq!(bytes_per_param("I8"), 1);
        assert_eq!(bytes_per_param("I32"), 4);
        assert_eq!(bytes_per_param("F64"), 8);
    }

    #[test]
    fn float8_variants_are_one_byte() {
        assert_eq!(bytes_per_param("F8_E4M3"), 1);
        assert_eq!(bytes_per_param("f8_e5m2"), 1);
    }

    #[test]
    fn unknown_labels_default_to_four_bytes() {
        assert_eq!(bytes_per_param("F32"), 4);
        assert_eq!(bytes_per_param("BOOL"), 4);
        assert_eq!(bytes_per_param(""), 4);
        assert_eq!(bytes_per_param("something"), 4);
    }

    #[test]
    fn torch_names_map_to_safetensors_labels() {
        assert_eq!(torch_dtype_to_safetensors("float16"), "F16");
        assert_eq!(torch_dtype_to_safetensors("bfloat16"), "BF16");
        assert_eq!(torch_dtype_to_safetensors("long"), "I64");
        assert_eq!(torch_dtype_to_safetensors("byte"), "U8");
        assert_eq!(torch_dtype_to_safetensors("complex128"), "C128");
        assert_eq!(torch_dtype_to_safetensors("float8_e4m3fn"), "FLOAT8_E4M3FN");
    }

    #[test]
    fn torch_name_round_trips_to_byte_width() {
        assert_eq!(bytes_per_param(&torch_dtype_to_safetensors("float16")), 2);
        assert_eq!(bytes_per_param(&torch_dtype_to_safetensors("int64")), 8);
    }
}
