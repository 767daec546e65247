//! Checked-in protobuf and gRPC stubs for `profile.v1`.

pub mod profile {
    pub mod v1 {
        include!("generated/profile.v1.rs");

        /// Encoded `FileDescriptorSet` for server reflection.
        pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!("generated/profile_descriptor.bin");
    }
}
