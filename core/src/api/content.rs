use serde_json::Value;

use crate::envelope::{pluck, Unwrap};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::http::HttpMethod;
use crate::keys::{BANNER_TEXT, PROMO_SECTION, SLIDERS, TOP_WINNERS, UPCOMING_MATCHES};
use crate::optimistic::Optimistic;
use crate::resource::{Collection, Singleton};
use crate::types::{BannerText, PromoSection, Slider, StatusUpdate, TopWinner, UpcomingMatch};

/// Shown when a failed toggle carries no server message.
pub const PROMO_TOGGLE_FALLBACK: &str = "Failed to update promo section status";

#[derive(Debug, Clone)]
pub struct ContentApi {
    gateway: Gateway,
}

impl ContentApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Sliders; create and update take a `SliderForm` upload.
    pub fn sliders(&self) -> Collection<Slider> {
        Collection::new(self.gateway.clone(), SLIDERS)
    }

    pub fn top_winners(&self) -> Collection<TopWinner> {
        Collection::new(self.gateway.clone(), TOP_WINNERS)
    }

    pub fn upcoming_matches(&self) -> Collection<UpcomingMatch> {
        Collection::new(self.gateway.clone(), UPCOMING_MATCHES)
    }

    pub fn banner_text(&self) -> Singleton<BannerText> {
        Singleton::new(self.gateway.clone(), BANNER_TEXT)
    }

    /// `PUT /banner-text`, shown in the cache before the server answers.
    pub async fn edit_banner_text(&self, banner: BannerText) -> Result<Option<BannerText>, ApiError> {
        let request = self
            .gateway
            .api()
            .build_json(HttpMethod::Put, BANNER_TEXT.path, &banner)?;
        let proposed = banner.clone();
        Optimistic::<BannerText>::new(self.gateway.cache().clone(), BANNER_TEXT.all())
            .run(
                move |_| Some(proposed),
                self.gateway.execute_plucked::<BannerText>(request, BANNER_TEXT.item_field),
                |confirmed| confirmed.clone(),
            )
            .await
    }

    pub fn promo_section(&self) -> Singleton<PromoSection> {
        Singleton::new(self.gateway.clone(), PROMO_SECTION)
    }

    /// Flip `isActive` on the promo section.
    ///
    /// The cache shows the flipped value before `PATCH /promo-section/toggle`
    /// resolves. The confirmed section is taken from `data.promoSection`
    /// (or `data`); if neither holds one, the key is invalidated instead.
    /// On failure the previous value is restored; show the error with
    /// `error.user_message(PROMO_TOGGLE_FALLBACK)`.
    pub async fn toggle_promo_section(&self) -> Result<Option<PromoSection>, ApiError> {
        let current = match self.gateway.cache().get_query_data::<PromoSection>(&PROMO_SECTION.all()) {
            Some(section) => section,
            None => self.promo_section().get().fetch().await?,
        };
        let body = StatusUpdate {
            is_active: !current.is_active,
        };
        let request = self
            .gateway
            .api()
            .build_json(HttpMethod::Patch, &format!("{}/toggle", PROMO_SECTION.path), &body)?;
        let data = Optimistic::<PromoSection>::new(self.gateway.cache().clone(), PROMO_SECTION.all())
            .run(
                |snapshot| {
                    snapshot.map(|mut section| {
                        section.is_active = !section.is_active;
                        section
                    })
                },
                self.gateway.execute_value(request, Unwrap::Data),
                |data: &Value| pluck::<PromoSection>(data, PROMO_SECTION.item_field),
            )
            .await?;
        Ok(pluck(&data, PROMO_SECTION.item_field))
    }
}
