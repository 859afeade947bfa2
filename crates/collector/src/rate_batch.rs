use std::sync::Arc;

use anyhow::{anyhow, Result};
use arrow_array::builder::{Float64Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::rate_sample::RateSample;

/// Create the schema for bandwidth record batches
pub fn create_rate_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("time", DataType::Int64, false),
        Field::new("pod_uid", DataType::Utf8, false),
        Field::new("container_name", DataType::Utf8, false),
        Field::new("metric", DataType::Utf8, false),
        Field::new("value", DataType::Float64, false),
    ]))
}

/// Convert the samples of one cycle to an Arrow RecordBatch
pub fn samples_to_batch(samples: &[RateSample], schema: SchemaRef) -> Result<RecordBatch> {
    let count = samples.len();

    // Pod UIDs are 36 characters, container names are usually short
    let mut time_builder = Int64Builder::with_capacity(count);
    let mut pod_uid_builder = StringBuilder::with_capacity(count, count * 36);
    let mut container_name_builder = StringBuilder::with_capacity(count, count * 16);
    let mut metric_builder = StringBuilder::with_capacity(count, count * 30);
    let mut value_builder = Float64Builder::with_capacity(count);

    for sample in samples {
        time_builder.append_value(sample.time.timestamp());
        pod_uid_builder.append_value(&sample.key.pod_uid);
        container_name_builder.append_value(&sample.key.container_name);
        metric_builder.append_value(sample.metric);
        value_builder.append_value(sample.value);
    }

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(time_builder.finish()),
        Arc::new(pod_uid_builder.finish()),
        Arc::new(container_name_builder.finish()),
        Arc::new(metric_builder.finish()),
        Arc::new(value_builder.finish()),
    ];

    RecordBatch::try_new(schema, arrays).map_err(|e| anyhow!("Failed to create RecordBatch: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Float64Array, Int64Array, StringArray};
    use chrono::DateTime;
    use membw::metric_names::{MEM_BANDWIDTH_READ_CONTAINER, MEM_BANDWIDTH_WRITE_CONTAINER};
    use membw::ContainerKey;

    fn sample(secs: i64, container: &str, metric: &'static str, value: f64) -> RateSample {
        RateSample {
            time: DateTime::from_timestamp(secs, 0).unwrap(),
            key: ContainerKey::new("uid-1", container),
            metric,
            value,
        }
    }

    #[test]
    fn test_samples_to_batch() {
        let samples = vec![
            sample(1_700_000_010, "app", MEM_BANDWIDTH_READ_CONTAINER, 12.5),
            sample(1_700_000_010, "app", MEM_BANDWIDTH_WRITE_CONTAINER, 0.0),
            sample(1_700_000_011, "sidecar", MEM_BANDWIDTH_READ_CONTAINER, 0.25),
        ];

        let batch = samples_to_batch(&samples, create_rate_schema()).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 5);

        let time = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        let pod_uid = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        let container = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
        let metric = batch.column(3).as_any().downcast_ref::<StringArray>().unwrap();
        let value = batch.column(4).as_any().downcast_ref::<Float64Array>().unwrap();

        assert_eq!(time.value(0), 1_700_000_010);
        assert_eq!(time.value(2), 1_700_000_011);
        assert_eq!(pod_uid.value(1), "uid-1");
        assert_eq!(container.value(2), "sidecar");
        assert_eq!(metric.value(1), MEM_BANDWIDTH_WRITE_CONTAINER);
        assert_eq!(value.value(0), 12.5);
        assert_eq!(value.value(2), 0.25);
    }

    #[test]
    fn test_empty_cycle_gives_empty_batch() {
        let batch = samples_to_batch(&[], create_rate_schema()).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema(), create_rate_schema());
    }
}
