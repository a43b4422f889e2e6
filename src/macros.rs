// Macro for creating Arrow schema fields
macro_rules! field {
    ($name:expr, $data_type:expr) => {
        arrow::datatypes::Field::new($name, $data_type, true)
    };
    ($name:expr, $data_type:expr, $nullable:expr) => {
        arrow::datatypes::Field::new($name, $data_type, $nullable)
    };
}

// Macro for creating schemas with less boilerplate
macro_rules! schema {
    ($($name:expr => $data_type:expr $(, $nullable:expr)?);* $(;)?) => {
        arrow::datatypes::Schema::new(vec![
            $(field!($name, $data_type $(, $nullable)?),)*
        ])
    };
}

// Macro for creating record batches with less boilerplate
macro_rules! record_batch {
    ($schema:expr, $($array:expr),* $(,)?) => {
        arrow::record_batch::RecordBatch::try_new(
            std::sync::Arc::new($schema),
            vec![$($array,)*],
        )
    };
}

// Partition key columns repeat one value for every row
macro_rules! constant_string_array {
    ($value:expr, $len:expr) => {
        std::sync::Arc::new(arrow::array::StringArray::from_iter_values(
            std::iter::repeat($value).take($len),
        )) as arrow::array::ArrayRef
    };
}

macro_rules! constant_int32_array {
    ($value:expr, $len:expr) => {
        std::sync::Arc::new(arrow::array::Int32Array::from_iter_values(
            std::iter::repeat($value).take($len),
        )) as arrow::array::ArrayRef
    };
}

macro_rules! constant_uint8_array {
    ($value:expr, $len:expr) => {
        std::sync::Arc::new(arrow::array::UInt8Array::from_iter_values(
            std::iter::repeat($value).take($len),
        )) as arrow::array::ArrayRef
    };
}

macro_rules! constant_bool_array {
    ($value:expr, $len:expr) => {
        std::sync::Arc::new(arrow::array::BooleanArray::from(vec![$value; $len]))
            as arrow::array::ArrayRef
    };
}

// Macro for creating u32 id/rank arrays from record fields
macro_rules! uint32_array {
    ($records:expr, $field:ident) => {
        std::sync::Arc::new(arrow::array::UInt32Array::from_iter_values(
            $records.iter().map(|r| r.$field),
        )) as arrow::array::ArrayRef
    };
}

// Macro for creating count arrays
macro_rules! int64_array {
    ($records:expr, $field:ident) => {
        std::sync::Arc::new(arrow::array::Int64Array::from_iter_values(
            $records.iter().map(|r| r.$field),
        )) as arrow::array::ArrayRef
    };
}

// Macro for creating string arrays from record fields
macro_rules! string_array_required {
    ($records:expr, $field:ident) => {
        std::sync::Arc::new(arrow::array::StringArray::from_iter_values(
            $records.iter().map(|r| r.$field.as_str()),
        )) as arrow::array::ArrayRef
    };
}

// Macro for creating optional float arrays
macro_rules! float64_array_optional {
    ($records:expr, $field:ident) => {
        std::sync::Arc::new(arrow::array::Float64Array::from_iter(
            $records.iter().map(|r| r.$field),
        )) as arrow::array::ArrayRef
    };
}
