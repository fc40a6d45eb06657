//! The filesystem-wide metadata record.

use cryfs_utils::data::{Data, Deserializer, FixedSizeData, SerializationError, Serializer};

/// 16-byte random id identifying one filesystem across its lifetime, used
/// to detect filesystem substitution in a known base directory.
pub type FilesystemId = FixedSizeData<16>;

/// Filesystem metadata, persisted once per filesystem inside the encrypted
/// config file.
///
/// Serialized field-by-field with the binary serializer; `serialize` and
/// `deserialize` are exact inverses for every valid config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryConfig {
    root_blob: String,
    enc_key: String,
    cipher: String,
    version: String,
    created_with_version: String,
    last_opened_with_version: String,
    blocksize_bytes: u64,
    filesystem_id: FilesystemId,
    exclusive_client_id: Option<u32>,
    missing_block_is_integrity_violation: bool,
}

#[allow(clippy::too_many_arguments)]
impl CryConfig {
    pub fn new(
        root_blob: String,
        enc_key: String,
        cipher: String,
        version: String,
        created_with_version: String,
        last_opened_with_version: String,
        blocksize_bytes: u64,
        filesystem_id: FilesystemId,
        exclusive_client_id: Option<u32>,
        missing_block_is_integrity_violation: bool,
    ) -> CryConfig {
        CryConfig {
            root_blob,
            enc_key,
            cipher,
            version,
            created_with_version,
            last_opened_with_version,
            blocksize_bytes,
            filesystem_id,
            exclusive_client_id,
            missing_block_is_integrity_violation,
        }
    }

    /// Hex id of the root blob, or empty if the filesystem was never
    /// mounted ("create on first mount").
    pub fn root_blob(&self) -> &str {
        &self.root_blob
    }

    pub fn set_root_blob(&mut self, root_blob: impl Into<String>) {
        self.root_blob = root_blob.into();
    }

    /// Hex of the inner encryption key the block store layer uses.
    pub fn enc_key(&self) -> &str {
        &self.enc_key
    }

    pub fn set_enc_key(&mut self, enc_key: impl Into<String>) {
        self.enc_key = enc_key.into();
    }

    /// Canonical name of the cipher in the registry.
    pub fn cipher(&self) -> &str {
        &self.cipher
    }

    pub fn set_cipher(&mut self, cipher: impl Into<String>) {
        self.cipher = cipher.into();
    }

    /// Format version of the filesystem this config belongs to.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn created_with_version(&self) -> &str {
        &self.created_with_version
    }

    pub fn set_created_with_version(&mut self, version: impl Into<String>) {
        self.created_with_version = version.into();
    }

    pub fn last_opened_with_version(&self) -> &str {
        &self.last_opened_with_version
    }

    pub fn set_last_opened_with_version(&mut self, version: impl Into<String>) {
        self.last_opened_with_version = version.into();
    }

    pub fn blocksize_bytes(&self) -> u64 {
        self.blocksize_bytes
    }

    pub fn filesystem_id(&self) -> &FilesystemId {
        &self.filesystem_id
    }

    pub fn set_filesystem_id(&mut self, filesystem_id: FilesystemId) {
        self.filesystem_id = filesystem_id;
    }

    /// Single client allowed to write, for single-client integrity mode.
    pub fn exclusive_client_id(&self) -> Option<u32> {
        self.exclusive_client_id
    }

    pub fn set_exclusive_client_id(&mut self, client_id: Option<u32>) {
        self.exclusive_client_id = client_id;
    }

    pub fn missing_block_is_integrity_violation(&self) -> bool {
        self.missing_block_is_integrity_violation
    }

    pub fn serialize(&self) -> Data {
        let size = Serializer::string_size(&self.root_blob)
            + Serializer::string_size(&self.enc_key)
            + Serializer::string_size(&self.cipher)
            + Serializer::string_size(&self.version)
            + Serializer::string_size(&self.created_with_version)
            + Serializer::string_size(&self.last_opened_with_version)
            + 8
            + FilesystemId::BINARY_LENGTH
            + 1
            + 4
            + 1;
        let mut serializer = Serializer::new(size);
        // Writes into a correctly presized record cannot fail; the strings
        // are validated NUL-free at set time by construction of the config.
        serializer.write_string(&self.root_blob).unwrap();
        serializer.write_string(&self.enc_key).unwrap();
        serializer.write_string(&self.cipher).unwrap();
        serializer.write_string(&self.version).unwrap();
        serializer.write_string(&self.created_with_version).unwrap();
        serializer.write_string(&self.last_opened_with_version).unwrap();
        serializer.write_u64(self.blocksize_bytes).unwrap();
        serializer.write_fixed_data(self.filesystem_id.data()).unwrap();
        match self.exclusive_client_id {
            Some(client_id) => {
                serializer.write_bool(true).unwrap();
                serializer.write_u32(client_id).unwrap();
            }
            None => {
                serializer.write_bool(false).unwrap();
                serializer.write_u32(0).unwrap();
            }
        }
        serializer
            .write_bool(self.missing_block_is_integrity_violation)
            .unwrap();
        serializer.finished().unwrap()
    }

    pub fn deserialize(source: &[u8]) -> Result<CryConfig, SerializationError> {
        let mut deserializer = Deserializer::new(source);
        let root_blob = deserializer.read_string()?;
        let enc_key = deserializer.read_string()?;
        let cipher = deserializer.read_string()?;
        let version = deserializer.read_string()?;
        let created_with_version = deserializer.read_string()?;
        let last_opened_with_version = deserializer.read_string()?;
        let blocksize_bytes = deserializer.read_u64()?;
        let filesystem_id =
            FilesystemId::from_slice(deserializer.read_fixed_data(FilesystemId::BINARY_LENGTH)?);
        let has_exclusive_client_id = deserializer.read_bool()?;
        let exclusive_client_id_value = deserializer.read_u32()?;
        let missing_block_is_integrity_violation = deserializer.read_bool()?;
        deserializer.finished()?;
        Ok(CryConfig {
            root_blob,
            enc_key,
            cipher,
            version,
            created_with_version,
            last_opened_with_version,
            blocksize_bytes,
            filesystem_id,
            exclusive_client_id: has_exclusive_client_id.then_some(exclusive_client_id_value),
            missing_block_is_integrity_violation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryfs_utils::data::DataFixture;

    fn example_config() -> CryConfig {
        CryConfig::new(
            "1A2B3C".to_string(),
            "3B4682CF22F3CA199E385729B9F3CA19D325229E385729B9443CA19D325229E3".to_string(),
            "aes-256-gcm".to_string(),
            "0.10".to_string(),
            "0.9.2".to_string(),
            "0.10.1".to_string(),
            32768,
            DataFixture::generate_fixed_size::<16>(1),
            Some(12345),
            false,
        )
    }

    #[test]
    fn serialize_roundtrip() {
        let config = example_config();
        let deserialized = CryConfig::deserialize(config.serialize().as_slice()).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn serialize_roundtrip_without_exclusive_client() {
        let mut config = example_config();
        config.set_exclusive_client_id(None);
        let deserialized = CryConfig::deserialize(config.serialize().as_slice()).unwrap();
        assert_eq!(config, deserialized);
        assert_eq!(None, deserialized.exclusive_client_id());
    }

    #[test]
    fn serialize_roundtrip_with_empty_root_blob() {
        let mut config = example_config();
        config.set_root_blob("");
        let deserialized = CryConfig::deserialize(config.serialize().as_slice()).unwrap();
        assert_eq!("", deserialized.root_blob());
    }

    #[test]
    fn deserialize_rejects_truncated_record() {
        let serialized = example_config().serialize();
        let truncated = &serialized.as_slice()[..serialized.len() - 2];
        assert!(CryConfig::deserialize(truncated).is_err());
    }

    #[test]
    fn deserialize_rejects_trailing_garbage() {
        let mut bytes = example_config().serialize().into_vec();
        bytes.push(0);
        assert!(CryConfig::deserialize(&bytes).is_err());
    }
}
