use palette::cast::ArrayCast;

/// A color type that can be viewed as an array of `N` components.
///
/// This is blanket implemented for every [`ArrayCast`] type from [`palette`]
/// (e.g., `Srgb<u8>` as `[u8; 3]` or `Srgba<u8>` as `[u8; 4]`).
pub trait ColorComponents<Component, const N: usize>:
    ArrayCast<Array = [Component; N]> + Copy + 'static
{
}

impl<Color, Component, const N: usize> ColorComponents<Component, N> for Color where
    Color: ArrayCast<Array = [Component; N]> + Copy + 'static
{
}
