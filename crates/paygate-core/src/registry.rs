//! Static catalog of supported wallet backends.

use crate::types::{BackendId, IconRef, ProviderDescriptor};

static DESCRIPTORS: [ProviderDescriptor; 3] = [
    ProviderDescriptor {
        id: BackendId::Injected,
        display_name: "MetaMask",
        icon: IconRef("metamask.png"),
    },
    ProviderDescriptor {
        id: BackendId::SdkHosted,
        display_name: "Coinbase Wallet",
        icon: IconRef("coinbase.png"),
    },
    ProviderDescriptor {
        id: BackendId::Relay,
        display_name: "WalletConnect",
        icon: IconRef("walletconnect.png"),
    },
];

/// All supported backends, in display order.
pub fn descriptors() -> &'static [ProviderDescriptor] {
    &DESCRIPTORS
}

/// Descriptor for a backend. Every [`BackendId`] has exactly one.
pub fn descriptor(id: BackendId) -> &'static ProviderDescriptor {
    match id {
        BackendId::Injected => &DESCRIPTORS[0],
        BackendId::SdkHosted => &DESCRIPTORS[1],
        BackendId::Relay => &DESCRIPTORS[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_descriptor_per_backend() {
        for id in BackendId::ALL {
            assert_eq!(descriptor(id).id, id);
        }
        assert_eq!(descriptors().len(), BackendId::ALL.len());
    }

    #[test]
    fn order_matches_backend_order() {
        let ids: Vec<BackendId> = descriptors().iter().map(|d| d.id).collect();
        assert_eq!(ids, BackendId::ALL.to_vec());
    }
}
