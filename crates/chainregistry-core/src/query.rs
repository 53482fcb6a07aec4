//! Read-only lookups over the identity index.
//!
//! All lookups are synchronous and only take read locks; they never wait for
//! a sync pass to finish. A miss is reported as [`RegistryError::NotFound`].
//!
//! Chained lookups (`fid_by_fname`, `fname_by_fid`) cross both halves of the
//! index, which may be synced to different heights while a pass is running.

use crate::error::RegistryError;
use crate::index::IdentityIndex;
use crate::types::normalize_address;

/// Lookups between fids, fnames and addresses.
pub trait RegistryQuery {
    /// fid registered to `address`.
    fn fid_by_address(&self, address: &str) -> Result<u64, RegistryError>;

    /// fid of the address that currently owns `fname`.
    fn fid_by_fname(&self, fname: &str) -> Result<u64, RegistryError>;

    /// Owner address of `fname`.
    fn address_by_fname(&self, fname: &str) -> Result<String, RegistryError>;

    /// Owner address of `fid`.
    fn address_by_fid(&self, fid: u64) -> Result<String, RegistryError>;

    /// fname owned by the address `fid` is registered to.
    fn fname_by_fid(&self, fid: u64) -> Result<String, RegistryError>;

    /// fname owned by `address`.
    fn fname_by_address(&self, address: &str) -> Result<String, RegistryError>;
}

impl RegistryQuery for IdentityIndex {
    fn fid_by_address(&self, address: &str) -> Result<u64, RegistryError> {
        normalize_address(address)
            .and_then(|addr| self.fid_of_address(&addr))
            .ok_or_else(|| RegistryError::not_found("address", address))
    }

    fn fid_by_fname(&self, fname: &str) -> Result<u64, RegistryError> {
        self.address_of_fname(fname)
            .and_then(|addr| self.fid_of_address(&addr))
            .ok_or_else(|| RegistryError::not_found("fname", fname))
    }

    fn address_by_fname(&self, fname: &str) -> Result<String, RegistryError> {
        self.address_of_fname(fname)
            .ok_or_else(|| RegistryError::not_found("fname", fname))
    }

    fn address_by_fid(&self, fid: u64) -> Result<String, RegistryError> {
        self.address_of_fid(fid)
            .ok_or_else(|| RegistryError::not_found("fid", fid))
    }

    fn fname_by_fid(&self, fid: u64) -> Result<String, RegistryError> {
        self.address_of_fid(fid)
            .and_then(|addr| self.fname_of_address(&addr))
            .ok_or_else(|| RegistryError::not_found("fid", fid))
    }

    fn fname_by_address(&self, address: &str) -> Result<String, RegistryError> {
        normalize_address(address)
            .and_then(|addr| self.fname_of_address(&addr))
            .ok_or_else(|| RegistryError::not_found("address", address))
    }
}

impl<T: RegistryQuery + ?Sized> RegistryQuery for std::sync::Arc<T> {
    fn fid_by_address(&self, address: &str) -> Result<u64, RegistryError> {
        (**self).fid_by_address(address)
    }

    fn fid_by_fname(&self, fname: &str) -> Result<u64, RegistryError> {
        (**self).fid_by_fname(fname)
    }

    fn address_by_fname(&self, fname: &str) -> Result<String, RegistryError> {
        (**self).address_by_fname(fname)
    }

    fn address_by_fid(&self, fid: u64) -> Result<String, RegistryError> {
        (**self).address_by_fid(fid)
    }

    fn fname_by_fid(&self, fid: u64) -> Result<String, RegistryError> {
        (**self).fname_by_fid(fid)
    }

    fn fname_by_address(&self, address: &str) -> Result<String, RegistryError> {
        (**self).fname_by_address(address)
    }
}
