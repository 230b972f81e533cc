use async_trait::async_trait;
use serde_json::{json, Value};

use super::{unknown_method, ViewError, ViewModel};
use crate::format::format_file_size;

/// Host for the size formatter. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProcessing;

impl FileProcessing {
    pub const NAME: &'static str = "fileProcessing";

    pub fn format_file_size(&self, bytes_size: f64) -> String {
        format_file_size(bytes_size)
    }
}

#[async_trait]
impl ViewModel for FileProcessing {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn data(&self) -> Value {
        json!({})
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ViewError> {
        match method {
            "formatFileSize" => {
                let bytes_size = args.first().and_then(Value::as_f64).ok_or_else(|| {
                    ViewError::InvalidArgument {
                        method: method.to_string(),
                        message: "expected a byte count".to_string(),
                    }
                })?;
                Ok(Value::String(self.format_file_size(bytes_size)))
            }
            _ => Err(unknown_method(Self::NAME, method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn format_file_size_is_callable_by_name() {
        let host = FileProcessing;
        let result = host.call("formatFileSize", vec![json!(1500)]).await.unwrap();
        assert_eq!(result, json!("1.5 KB"));
    }

    #[tokio::test]
    async fn rejects_missing_or_non_numeric_argument() {
        let host = FileProcessing;
        assert!(matches!(
            host.call("formatFileSize", vec![]).await,
            Err(ViewError::InvalidArgument { .. })
        ));
        assert!(matches!(
            host.call("formatFileSize", vec![json!("1500")]).await,
            Err(ViewError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        assert!(matches!(
            FileProcessing.call("fetchData", vec![]).await,
            Err(ViewError::UnknownMethod { .. })
        ));
    }
}
