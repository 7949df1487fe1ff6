use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
    public_base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Invalid file format")]
    InvalidFormat,
    #[error("File too large")]
    FileTooLarge,
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket_name,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn calculate_image_hash(image_data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(image_data);
        hex::encode(hasher.finalize())
    }

    pub fn generate_s3_key(user_id: Uuid, image_hash: &str, file_extension: &str) -> String {
        format!("images/{}/{}.{}", user_id, image_hash, file_extension)
    }

    pub fn content_type_for_extension(extension: &str) -> Result<&'static str, S3ServiceError> {
        match extension {
            "jpg" | "jpeg" => Ok("image/jpeg"),
            "png" => Ok("image/png"),
            "gif" => Ok("image/gif"),
            _ => Err(S3ServiceError::InvalidFormat),
        }
    }

    pub fn validate_image_size(image_data: &[u8]) -> Result<(), S3ServiceError> {
        const MAX_SIZE: usize = 50 * 1024 * 1024;
        if image_data.len() > MAX_SIZE {
            return Err(S3ServiceError::FileTooLarge);
        }
        Ok(())
    }

    /// Uploads the raw image and returns the public link stored verbatim on
    /// the classification event.
    pub async fn upload_image(
        &self,
        image_data: &[u8],
        s3_key: &str,
        mime_type: &str,
    ) -> Result<String, S3ServiceError> {
        S3Service::validate_image_size(image_data)?;

        let body = ByteStream::from(image_data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(s3_key)
            .body(body)
            .content_type(mime_type)
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        Ok(format!("{}/{}", self.public_base_url, s3_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_hash_is_stable_hex_sha256() {
        let hash = S3Service::calculate_image_hash(b"frame");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, S3Service::calculate_image_hash(b"frame"));
        assert_ne!(hash, S3Service::calculate_image_hash(b"other frame"));
    }

    #[test]
    fn s3_key_scopes_objects_by_user() {
        let user_id = Uuid::nil();
        let key = S3Service::generate_s3_key(user_id, "abc123", "jpg");
        assert_eq!(key, "images/00000000-0000-0000-0000-000000000000/abc123.jpg");
    }

    #[test]
    fn content_type_rejects_unknown_extensions() {
        assert_eq!(
            S3Service::content_type_for_extension("jpeg").unwrap(),
            "image/jpeg"
        );
        assert!(matches!(
            S3Service::content_type_for_extension("txt"),
            Err(S3ServiceError::InvalidFormat)
        ));
    }

    #[test]
    fn oversized_payloads_are_refused() {
        let oversized = vec![0u8; 50 * 1024 * 1024 + 1];
        assert!(matches!(
            S3Service::validate_image_size(&oversized),
            Err(S3ServiceError::FileTooLarge)
        ));
    }
}
