use listing_harvest::data_models::ListingPreview;
use listing_harvest::extractor::{extract_listings, extract_total_results};

const SEARCH_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>hard drive | eBay</title></head>
<body>
<div class="srp-controls"><h1 class="srp-controls__count-heading"><span class="BOLD">1,234</span> results for <span class="BOLD">hard drive</span></h1></div>
<ul class="srp-results srp-list clearfix">
<li class="s-item s-item__pl-on-bottom">
<div class="s-item__wrapper">
<div class="s-item__image"><img src="https://i.ebayimg.com/images/g/abc/s-l140.jpg" alt="drive"></div>
<div class="s-item__info">
<a class="s-item__link" href="https://www.ebay.com/itm/1111?hash=item1:g:abc&amp;var=1"><div class="s-item__title"><span>WD Red Plus 12TB NAS Hard Drive</span></div></a>
<div class="s-item__subtitle"><span class="SECONDARY_INFO">Pre-Owned</span></div>
<div class="s-item__subtitle">Tested, 100% health</div>
<div class="s-item__reviews"><div class="x-star-rating"><span class="clipped">4.5 out of 5 stars.</span></div></div>
<span class="s-item__reviews-count"><span>31 product ratings</span></span>
<span class="s-item__price">$129.99</span>
<span class="s-item__shipping s-item__logisticsCost">+$9.50 shipping</span>
<span class="s-item__listingDate"><span>Oct-14 09:12</span></span>
</div>
</div>
</li>
<li class="s-item">
<div class="s-item__info">
<a class="s-item__link" href="https://www.ebay.com/itm/2222"><div class="s-item__title"><span>Seagate 8TB Barracuda</span></div></a>
<span class="s-item__price">$10.00<span class="DEFAULT"> to </span>$20.00</span>
</div>
</li>
</ul>
</body>
</html>"#;

#[test]
fn test_extracts_every_card_in_document_order() {
    let listings = extract_listings(SEARCH_PAGE);
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].title, "WD Red Plus 12TB NAS Hard Drive");
    assert_eq!(listings[1].title, "Seagate 8TB Barracuda");
}

#[test]
fn test_full_card_fields() {
    let listing = &extract_listings(SEARCH_PAGE)[0];
    assert_eq!(
        listing,
        &ListingPreview {
            url: "https://www.ebay.com/itm/1111".to_string(),
            title: "WD Red Plus 12TB NAS Hard Drive".to_string(),
            price: "$129.99".to_string(),
            shipping: "+$9.50 shipping".to_string(),
            list_date: "Oct-14 09:12".to_string(),
            subtitles: vec!["Tested, 100% health".to_string()],
            condition: "Pre-Owned".to_string(),
            photo: "https://i.ebayimg.com/images/g/abc/s-l140.jpg".to_string(),
            rating: "4.5 out of 5 stars.".to_string(),
            rating_count: "31 product ratings".to_string(),
        }
    );
}

#[test]
fn test_missing_fields_default_to_empty() {
    let listing = &extract_listings(SEARCH_PAGE)[1];
    assert_eq!(listing.url, "https://www.ebay.com/itm/2222");
    assert_eq!(listing.price, "$10.00");
    assert_eq!(listing.shipping, "");
    assert_eq!(listing.list_date, "");
    assert!(listing.subtitles.is_empty());
    assert_eq!(listing.condition, "");
    assert_eq!(listing.photo, "");
    assert_eq!(listing.rating, "");
    assert_eq!(listing.rating_count, "");
}

#[test]
fn test_extraction_is_repeatable() {
    assert_eq!(extract_listings(SEARCH_PAGE), extract_listings(SEARCH_PAGE));
}

#[test]
fn test_page_without_cards_is_empty() {
    let body = r#"<html><body><div class="srp-save-null-search">No exact matches found</div></body></html>"#;
    assert!(extract_listings(body).is_empty());
    assert!(extract_listings("").is_empty());
    // cards outside the results list are not listings
    let stray = r#"<ul class="carousel"><li class="s-item"><span class="s-item__price">$1</span></li></ul>"#;
    assert!(extract_listings(stray).is_empty());
}

#[test]
fn test_total_results_from_heading() {
    assert_eq!(extract_total_results(SEARCH_PAGE), Some(1_234));
}
