use arrow::{
    array::{Array, ArrayRef, BooleanArray, Int64Array, StringArray},
    datatypes::DataType,
    error::ArrowError,
    util::display::array_value_to_string,
};
use sha2::{Digest, Sha256};

/// Digest width in bytes; 128 bits, rendered as 32 hex chars.
const ID_BYTES: usize = 16;

/// Render one row as a tuple literal, e.g. `('acme', '1 main st', 2, True, False)`.
///
/// Strings are single-quoted with `\` and `'` escaped, so a value containing a
/// separator cannot be confused with two values.
pub fn render_row(columns: &[ArrayRef], row: usize) -> Result<String, ArrowError> {
    let mut out = String::from("(");
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_value(col, row, &mut out)?;
    }
    if columns.len() == 1 {
        out.push(',');
    }
    out.push(')');
    Ok(out)
}

fn render_value(col: &ArrayRef, row: usize, out: &mut String) -> Result<(), ArrowError> {
    if col.is_null(row) {
        out.push_str("None");
        return Ok(());
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = downcast::<StringArray>(col)?;
            out.push('\'');
            for c in arr.value(row).chars() {
                if c == '\\' || c == '\'' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('\'');
        }
        DataType::Boolean => {
            let arr = downcast::<BooleanArray>(col)?;
            out.push_str(if arr.value(row) { "True" } else { "False" });
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(col)?;
            out.push_str(&arr.value(row).to_string());
        }
        _ => out.push_str(&array_value_to_string(col.as_ref(), row)?),
    }
    Ok(())
}

fn downcast<T: 'static>(col: &ArrayRef) -> Result<&T, ArrowError> {
    col.as_any().downcast_ref::<T>().ok_or_else(|| {
        ArrowError::CastError(format!("unexpected array type {}", col.data_type()))
    })
}

/// Hex content digest of a rendered row.
pub fn content_id(rendered: &str) -> String {
    let digest = Sha256::digest(rendered.as_bytes());
    hex::encode(&digest[..ID_BYTES])
}

/// Content digest for every row of `columns`.
pub fn row_ids(columns: &[ArrayRef], num_rows: usize) -> Result<StringArray, ArrowError> {
    let mut ids = Vec::with_capacity(num_rows);
    for row in 0..num_rows {
        ids.push(content_id(&render_row(columns, row)?));
    }
    Ok(StringArray::from(ids))
}
