//! Read-only keyed lookup shared by loaded asset stores

/// Keyed, read-only view over loaded items.
///
/// Keys are atlas frame names with or without their image extension, so
/// `sprite/plant/Carrot` and `sprite/plant/Carrot.png` name the same item.
///
/// ```
/// use image::RgbaImage;
/// use sprite_variants::registry::{Registry, RegistryBuilder};
/// use sprite_variants::texture::Texture;
///
/// let mut builder = RegistryBuilder::new();
/// builder.insert("sprite/plant/Carrot.png", Texture::from_image(RgbaImage::new(4, 4)));
/// let registry = builder.build();
///
/// assert!(registry.contains("sprite/plant/Carrot.png"));
/// assert_eq!(registry.len(), 1);
/// ```
pub trait Registry<V> {
    fn contains(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<&V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every item key, in sorted order.
    fn keys(&self) -> Box<dyn Iterator<Item = &str> + '_>;
}
