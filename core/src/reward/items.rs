use super::RewardError;
use crate::encounter::{ItemKind, ItemSpec};

/// A concrete item ready to hand to the reward host
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    pub kind: ItemKind,
    /// Material, `TYPE:ID`, or external name depending on `kind`
    pub key: String,
    pub amount: u32,
    pub display_name: Option<String>,
}

/// Resolves configured items through their provider
pub trait ItemCatalog {
    fn inventory_item(
        &self,
        material: &str,
        display_name: Option<&str>,
        amount: u32,
    ) -> Result<ItemStack, RewardError>;

    fn external_item_by_id(&self, item_type: &str, id: &str, amount: u32) -> Result<ItemStack, RewardError>;

    fn external_item_by_name(&self, name: &str, amount: u32) -> Result<ItemStack, RewardError>;
}

/// Resolve through the provider named by `kind`
pub fn resolve_item<C: ItemCatalog + ?Sized>(
    catalog: &C,
    kind: ItemKind,
    material: &str,
    external_id: Option<&str>,
    display_name: Option<&str>,
    amount: u32,
) -> Result<ItemStack, RewardError> {
    match kind {
        ItemKind::Inventory => catalog.inventory_item(material, display_name, amount),
        ItemKind::ExternalId => {
            let id = external_id.ok_or_else(|| RewardError::MissingExternalId {
                item_type: material.to_string(),
            })?;
            catalog.external_item_by_id(material, id, amount)
        }
        ItemKind::ExternalName => catalog.external_item_by_name(material, amount),
    }
}

impl ItemSpec {
    pub fn resolve<C: ItemCatalog + ?Sized>(&self, catalog: &C, amount: u32) -> Result<ItemStack, RewardError> {
        resolve_item(
            catalog,
            self.kind,
            &self.material,
            self.id.as_deref(),
            self.display_name.as_deref(),
            amount,
        )
    }
}

/// `max(1, round(base × multiplier))`
pub fn granted_amount(base: u32, multiplier: f64) -> u32 {
    let scaled = (f64::from(base) * multiplier).round().max(1.0);
    scaled.min(f64::from(u32::MAX)) as u32
}

/// Keep `[A-Za-z0-9_]`. `None` when nothing is left.
pub fn sanitize_name(name: &str) -> Option<String> {
    let clean: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!clean.is_empty()).then_some(clean)
}

/// Keep `[A-Za-z0-9_.-]`. `None` when nothing is left.
pub fn sanitize_loot_table(name: &str) -> Option<String> {
    let clean: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    (!clean.is_empty()).then_some(clean)
}

/// Commands carrying shell-style separators or substitutions are never
/// replayed from the pending queue.
pub fn is_unsafe_command(command: &str) -> bool {
    command.contains([';', '&', '|', '`', '$'])
}
